use crate::ports::transaction_log::{LogEntry, Result, TransactionLog as TransactionLogTrait};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory implementation of TransactionLog
///
/// Keeps rendered lines so tests can assert on what was logged.
/// Can be switched into a failing mode to check that logging errors
/// never change the outcome of a borrow or return.
pub struct TransactionLog {
    lines: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// Make every subsequent append fail
    pub fn fail_appends(&self) {
        *self.failing.lock().unwrap() = true;
    }

    /// All lines appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionLogTrait for TransactionLog {
    async fn append(&self, entry: LogEntry) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err("transaction log unavailable".into());
        }
        self.lines.lock().unwrap().push(entry.to_string());
        Ok(())
    }

    async fn tail(&self, n: usize) -> Result<Vec<String>> {
        let lines = self.lines.lock().unwrap();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].to_vec())
    }
}
