use std::cell::RefCell;

/// Receives user-facing outcome messages. Fire and forget.
pub trait NotificationSink {
    fn notify_success(&self, message: &str);
    fn notify_failure(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(message) | Notice::Failure(message) => message,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failure(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify_success(&self, message: &str) {
        tracing::info!(target: "docdesk::notice", "{message}");
    }

    fn notify_failure(&self, message: &str) {
        tracing::warn!(target: "docdesk::notice", "{message}");
    }
}

/// Keeps every notice in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    notices: RefCell<Vec<Notice>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn take(&self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn failures(&self) -> usize {
        self.notices.borrow().iter().filter(|n| n.is_failure()).count()
    }
}

impl NotificationSink for MemorySink {
    fn notify_success(&self, message: &str) {
        self.notices
            .borrow_mut()
            .push(Notice::Success(message.to_string()));
    }

    fn notify_failure(&self, message: &str) {
        self.notices
            .borrow_mut()
            .push(Notice::Failure(message.to_string()));
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify_success(&self, message: &str) {
        (**self).notify_success(message);
    }

    fn notify_failure(&self, message: &str) {
        (**self).notify_failure(message);
    }
}

/// Forwards to both sinks, e.g. log and record.
pub struct Tee<A, B>(pub A, pub B);

impl<A: NotificationSink, B: NotificationSink> NotificationSink for Tee<A, B> {
    fn notify_success(&self, message: &str) {
        self.0.notify_success(message);
        self.1.notify_success(message);
    }

    fn notify_failure(&self, message: &str) {
        self.0.notify_failure(message);
        self.1.notify_failure(message);
    }
}
