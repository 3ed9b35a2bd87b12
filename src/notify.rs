//! Fire-and-forget notification fan-out.
//!
//! Mutating HTTP handlers publish a small display event here after a
//! successful commit; the WebSocket layer subscribes and forwards the
//! serialized events to connected clients. Publishing never fails the
//! originating mutation: a channel with no receivers just drops the event.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Display event pushed to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub icon: String,
    pub description: String,
    pub color: String,
    /// Server-side stamp, `YYYY-MM-DD HH:MM:SS`.
    pub time: String,
}

/// Pub-sub handle over a broadcast channel. Cloning is cheap and every
/// clone publishes into the same channel.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<String>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Stamp and publish a display event.
    pub fn notify(&self, title: &str, icon: &str, description: &str, color: &str) {
        self.send(&Notification {
            title: title.to_string(),
            icon: icon.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    /// Publish an already-built event.
    pub fn send(&self, event: &Notification) {
        match serde_json::to_string(event) {
            Ok(json) => {
                // Err means no receivers are connected right now.
                let _ = self.tx.send(json);
            }
            Err(e) => {
                tracing::warn!("Failed to serialize notification: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_delivers_to_subscriber() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.subscribe();

        notifier.notify("Work order", "clipboard", "WO-1 started", "green");

        let raw = rx.recv().await.unwrap();
        let event: Notification = serde_json::from_str(&raw).unwrap();
        assert_eq!(event.title, "Work order");
        assert_eq!(event.icon, "clipboard");
        assert_eq!(event.description, "WO-1 started");
        assert_eq!(event.color, "green");
    }

    #[tokio::test]
    async fn test_notify_without_subscribers_is_silent() {
        let notifier = Notifier::new(16);
        // No receiver; must not panic or error.
        notifier.notify("t", "i", "d", "c");
    }

    #[test]
    fn test_time_stamp_format() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.subscribe();
        notifier.notify("t", "i", "d", "c");

        let raw = rx.try_recv().unwrap();
        let event: Notification = serde_json::from_str(&raw).unwrap();
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(event.time.len(), 19);
        assert_eq!(&event.time[4..5], "-");
        assert_eq!(&event.time[10..11], " ");
        assert_eq!(&event.time[13..14], ":");
    }

    #[test]
    fn test_notification_field_names() {
        let event = Notification {
            title: "t".into(),
            icon: "i".into(),
            description: "d".into(),
            color: "c".into(),
            time: "2024-01-01 00:00:00".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["title"], "t");
        assert_eq!(json["icon"], "i");
        assert_eq!(json["description"], "d");
        assert_eq!(json["color"], "c");
        assert_eq!(json["time"], "2024-01-01 00:00:00");
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_event() {
        let notifier = Notifier::new(16);
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        notifier.notify("a", "i", "d", "c");
        notifier.notify("b", "i", "d", "c");

        for rx in [&mut rx1, &mut rx2] {
            let first: Notification = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            let second: Notification = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(first.title, "a");
            assert_eq!(second.title, "b");
        }
    }
}
