use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Warnings and errors meant for the user, drained by whoever displays them.
#[derive(Clone, Default)]
pub struct MessagesAggregator {
    warnings: Arc<Mutex<VecDeque<String>>>,
    errors: Arc<Mutex<VecDeque<String>>>,
}

impl MessagesAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&self, message: impl Into<String>) {
        self.warnings.lock().push_back(message.into());
    }

    pub fn add_error(&self, message: impl Into<String>) {
        self.errors.lock().push_back(message.into());
    }

    pub fn consume_warnings(&self) -> Vec<String> {
        self.warnings.lock().drain(..).collect()
    }

    pub fn consume_errors(&self) -> Vec<String> {
        self.errors.lock().drain(..).collect()
    }
}
