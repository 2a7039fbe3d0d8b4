pub mod catalog;
pub mod commands;
pub mod errors;
pub mod events;
pub mod item;
pub mod patron;
pub mod snapshot;
pub mod value_objects;

pub use catalog::*;
pub use errors::*;
pub use events::*;
pub use item::*;
pub use patron::*;
pub use snapshot::*;
pub use value_objects::*;
