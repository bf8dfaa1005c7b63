use std::collections::VecDeque;

const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
    pub expires_at: u64,
}

/// Transient toasts. Newest last; expired entries are dropped by [`Notifications::expire`].
#[derive(Debug, Clone)]
pub struct Notifications {
    ttl_secs: u64,
    next_id: u64,
    items: VecDeque<Notification>,
}

impl Notifications {
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl_secs: ttl_secs.max(1), next_id: 1, items: VecDeque::new() }
    }

    pub fn push(&mut self, now_unix: u64, level: Level, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification {
            id,
            level,
            message: message.into(),
            expires_at: now_unix.saturating_add(self.ttl_secs),
        });
        while self.items.len() > MAX_NOTIFICATIONS {
            self.items.pop_front();
        }
        id
    }

    /// Returns true if anything was removed.
    pub fn expire(&mut self, now_unix: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.expires_at > now_unix);
        before != self.items.len()
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        before != self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
