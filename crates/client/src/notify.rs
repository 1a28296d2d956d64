use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    active: Vec<Notification>,
}

/// Dismissible user-facing messages. Cheap to clone; clones share the list.
#[derive(Clone, Default)]
pub struct Notifications {
    inner: Arc<Mutex<Inner>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while pushing cannot leave the list half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, level: Level, message: impl Into<String>) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.active.push(Notification {
            id,
            level,
            message: message.into(),
        });
        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Error, message)
    }

    /// Returns `false` if `id` was already dismissed.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let before = inner.active.len();
        inner.active.retain(|n| n.id != id);
        inner.active.len() != before
    }

    pub fn active(&self) -> Vec<Notification> {
        self.lock().active.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .active
            .iter()
            .filter(|n| n.level == Level::Error)
            .map(|n| n.message.clone())
            .collect()
    }
}
