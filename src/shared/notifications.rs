use crate::domain::notification::{Notification, NotificationLevel};
use chrono::Local;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

const MAX_NOTIFICATIONS: usize = 100;

/// Bounded buffer of user notifications shared by every component.
#[derive(Clone, Default)]
pub struct Notifications {
    entries: Arc<Mutex<VecDeque<Notification>>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &self,
        level: NotificationLevel,
        title: &str,
        description: Option<&str>,
    ) -> Notification {
        let entry = Notification {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            title: title.to_string(),
            description: description.map(|value| value.to_string()),
        };

        match level {
            NotificationLevel::Error => warn!(title, description, "user notification"),
            _ => info!(title, description, "user notification"),
        }

        let mut entries = self.lock();
        entries.push_back(entry.clone());
        while entries.len() > MAX_NOTIFICATIONS {
            entries.pop_front();
        }
        entry
    }

    pub fn info(&self, title: &str, description: Option<&str>) -> Notification {
        self.push(NotificationLevel::Info, title, description)
    }

    pub fn success(&self, title: &str, description: Option<&str>) -> Notification {
        self.push(NotificationLevel::Success, title, description)
    }

    pub fn error(&self, title: &str, description: Option<&str>) -> Notification {
        self.push(NotificationLevel::Error, title, description)
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.lock().back().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_only_newest_entries() {
        let notifications = Notifications::new();
        for index in 0..(MAX_NOTIFICATIONS + 5) {
            notifications.info(&format!("n{}", index), None);
        }
        let recent = notifications.recent();
        assert_eq!(recent.len(), MAX_NOTIFICATIONS);
        assert_eq!(recent[0].title, "n5");
        assert_eq!(recent.last().unwrap().title, format!("n{}", MAX_NOTIFICATIONS + 4));
    }

    #[test]
    fn test_clones_share_buffer() {
        let notifications = Notifications::new();
        let other = notifications.clone();
        other.error("Analysis Failed", Some("boom"));
        let last = notifications.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.description.as_deref(), Some("boom"));
    }
}
