pub mod file;
pub mod mock;
