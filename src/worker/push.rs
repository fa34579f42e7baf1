use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ICON, MAX_NOTIFICATIONS};

/// 推送消息内容
#[derive(Deserialize, Debug, Clone)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
}

/// 已展示的通知
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub shown_at: DateTime<Utc>,
}

/// 已展示通知列表，超过上限时丢弃最早的通知
#[derive(Default)]
pub struct NotificationCenter {
    next_id: AtomicU64,
    shown: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self, payload: PushPayload) -> Notification {
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            title: payload.title,
            body: payload.body,
            icon: payload.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            shown_at: Utc::now(),
        };
        let mut shown = self.shown.lock();
        if shown.len() >= MAX_NOTIFICATIONS {
            shown.pop_front();
        }
        shown.push_back(notification.clone());
        notification
    }

    /// 关闭通知，返回被关闭的通知
    pub fn close(&self, id: u64) -> Option<Notification> {
        let mut shown = self.shown.lock();
        let index = shown.iter().position(|n| n.id == id)?;
        shown.remove(index)
    }

    pub fn list(&self) -> Vec<Notification> {
        self.shown.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, icon: Option<&str>) -> PushPayload {
        PushPayload {
            title: title.to_string(),
            body: "body".to_string(),
            icon: icon.map(str::to_string),
        }
    }

    #[test]
    fn test_default_icon() {
        let center = NotificationCenter::new();
        let n = center.show(payload("hello", None));
        assert_eq!(n.icon, DEFAULT_ICON);

        let n = center.show(payload("hello", Some("/images/custom.png")));
        assert_eq!(n.icon, "/images/custom.png");
    }

    #[test]
    fn test_payload_without_icon_decodes() {
        let payload: PushPayload =
            serde_json::from_str(r#"{"title":"New quest","body":"Go north"}"#).unwrap();
        assert_eq!(payload.title, "New quest");
        assert!(payload.icon.is_none());
    }

    #[test]
    fn test_close() {
        let center = NotificationCenter::new();
        let first = center.show(payload("first", None));
        let second = center.show(payload("second", None));
        assert_ne!(first.id, second.id);

        assert_eq!(center.close(first.id).map(|n| n.title), Some("first".into()));
        assert!(center.close(first.id).is_none());
        assert_eq!(center.list(), vec![second]);
    }

    #[test]
    fn test_capacity() {
        let center = NotificationCenter::new();
        for i in 0..MAX_NOTIFICATIONS + 3 {
            center.show(payload(&format!("n{i}"), None));
        }
        let list = center.list();
        assert_eq!(list.len(), MAX_NOTIFICATIONS);
        assert_eq!(list[0].title, "n3");
    }
}
