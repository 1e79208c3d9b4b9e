use crate::models::Message;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    /// Raising an alert; returns to `Polling` once delivered
    Notifying,
}

/// Client-side notification state for one signed-in session.
///
/// Created when the session starts and dropped on sign-out.
#[derive(Debug, Clone)]
pub struct NotificationStore {
    pub notifications: Vec<Message>,
    pub unread_count: usize,
    /// `None` until the first successful poll of the session
    pub prev_count: Option<usize>,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub state: PollerState,
}

impl NotificationStore {
    pub fn new(sound_enabled: bool, notifications_enabled: bool) -> Self {
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            prev_count: None,
            sound_enabled,
            notifications_enabled,
            last_seen: None,
            state: PollerState::Idle,
        }
    }

    /// Records one poll result. Returns how many new messages to announce, if any.
    pub fn apply_poll(&mut self, unread: Vec<Message>) -> Option<usize> {
        let visible: Vec<Message> = match (self.notifications_enabled, self.last_seen) {
            (false, Some(seen)) => unread.into_iter().filter(|m| m.created_at <= seen).collect(),
            _ => unread,
        };

        let count = visible.len();
        let previous = self.prev_count.replace(count);
        self.unread_count = count;
        self.notifications = visible;

        match previous {
            Some(prev) if self.notifications_enabled && count > prev => Some(count - prev),
            _ => None,
        }
    }

    /// Re-enabling marks everything up to now as seen
    pub fn set_notifications_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        self.notifications_enabled = enabled;
        if enabled {
            self.last_seen = Some(now);
        }
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    pub fn mark_read(&mut self, message_id: &str) {
        let before = self.notifications.len();
        self.notifications.retain(|m| m.id != message_id);
        if self.notifications.len() < before {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
    }

    pub fn mark_all_read(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
    }
}

/// Toast title for `n` freshly arrived messages
pub fn toast_title(n: usize) -> String {
    format!("{} new message{}!", n, if n == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn messages(n: usize) -> Vec<Message> {
        (0..n).map(|i| Message::new(&format!("m{}", i))).collect()
    }

    #[test]
    fn first_poll_only_sets_the_baseline() {
        let mut store = NotificationStore::new(true, true);
        assert_eq!(store.apply_poll(messages(4)), None);
        assert_eq!(store.prev_count, Some(4));
        assert_eq!(store.unread_count, 4);
    }

    #[test]
    fn growth_alerts_with_the_delta() {
        let mut store = NotificationStore::new(true, true);
        store.apply_poll(messages(1));
        assert_eq!(store.apply_poll(messages(3)), Some(2));
        assert_eq!(store.apply_poll(messages(3)), None);
        assert_eq!(store.apply_poll(messages(2)), None);
        assert_eq!(store.apply_poll(messages(3)), Some(1));
    }

    #[test]
    fn disabled_notifications_never_alert_and_hide_newer_messages() {
        let mut store = NotificationStore::new(true, true);
        let seen = Utc::now();
        store.set_notifications_enabled(true, seen);
        store.set_notifications_enabled(false, seen);
        store.apply_poll(Vec::new());

        let mut old = Message::new("old");
        old.created_at = seen - Duration::minutes(1);
        let mut fresh = Message::new("fresh");
        fresh.created_at = seen + Duration::minutes(1);

        assert_eq!(store.apply_poll(vec![old, fresh]), None);
        assert_eq!(store.unread_count, 1);
        assert_eq!(store.notifications[0].content, "old");
    }

    #[test]
    fn local_read_marks_adjust_the_count() {
        let mut store = NotificationStore::new(true, true);
        let list = messages(2);
        let first = list[0].id.clone();
        store.apply_poll(list);

        store.mark_read(&first);
        assert_eq!(store.unread_count, 1);
        store.mark_read("unknown");
        assert_eq!(store.unread_count, 1);
        store.mark_all_read();
        assert_eq!(store.unread_count, 0);
        assert!(store.notifications.is_empty());
    }

    #[test]
    fn toast_titles_pluralise() {
        assert_eq!(toast_title(1), "1 new message!");
        assert_eq!(toast_title(3), "3 new messages!");
        let mut store = NotificationStore::new(true, true);
        assert!(!store.toggle_sound());
    }
}
