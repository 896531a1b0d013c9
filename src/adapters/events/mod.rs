//! Per-user connection registry and event fan-out.

use crate::domain::events::Event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Handle identifying one registered channel, returned by `register` and
/// required to unregister it again.
pub type ChannelId = u64;

struct Channel {
    id: ChannelId,
    tx: mpsc::UnboundedSender<Event>,
}

/// Registry mapping each user to the channels of their live connections.
///
/// Fan-out is best-effort: a channel whose receiver is gone is pruned on
/// the next send without affecting the user's other channels. Entries with
/// no channels left are removed from the map entirely.
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    channels: RwLock<HashMap<String, Vec<Channel>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel for a user, e.g. on an authenticated connection.
    /// Events for the user are received on the returned receiver until it
    /// is dropped or unregistered.
    pub async fn register(&self, user_id: &str) -> (ChannelId, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut channels = self.channels.write().await;
        channels
            .entry(user_id.to_string())
            .or_default()
            .push(Channel { id, tx });

        debug!(user = user_id, channel = id, "channel registered");
        (id, rx)
    }

    /// Drop one channel, e.g. on connection close or error.
    pub async fn unregister(&self, user_id: &str, channel_id: ChannelId) {
        let mut channels = self.channels.write().await;
        if let Some(list) = channels.get_mut(user_id) {
            list.retain(|channel| channel.id != channel_id);
            if list.is_empty() {
                channels.remove(user_id);
            }
        }
        debug!(user = user_id, channel = channel_id, "channel unregistered");
    }

    /// Deliver an event to every channel of one user. A user with no
    /// channels is a no-op.
    pub async fn notify_user(&self, user_id: &str, event: Event) {
        let mut channels = self.channels.write().await;
        if let Some(list) = channels.get_mut(user_id) {
            list.retain(|channel| channel.tx.send(event.clone()).is_ok());
            if list.is_empty() {
                channels.remove(user_id);
            }
        }
    }

    /// Deliver an event to every channel of every registered user.
    pub async fn notify_all(&self, event: Event) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, list| {
            list.retain(|channel| channel.tx.send(event.clone()).is_ok());
            !list.is_empty()
        });
    }

    /// Number of live channels for one user.
    pub async fn channel_count(&self, user_id: &str) -> usize {
        let channels = self.channels.read().await;
        channels.get(user_id).map_or(0, |list| list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn end_event() -> Event {
        Event::VideoEnd {
            video_id: "video-1".to_string(),
            profile_height: 720,
        }
    }

    #[tokio::test]
    async fn notify_user_reaches_every_channel_of_that_user() {
        let hub = EventHub::new();
        let (_, mut first) = hub.register("user-1").await;
        let (_, mut second) = hub.register("user-1").await;
        let (_, mut other) = hub.register("user-2").await;

        hub.notify_user("user-1", end_event()).await;

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn notify_user_without_channels_is_a_noop() {
        let hub = EventHub::new();
        hub.notify_user("nobody", end_event()).await;
    }

    #[tokio::test]
    async fn notify_all_reaches_every_registered_user() {
        let hub = EventHub::new();
        let (_, mut first) = hub.register("user-1").await;
        let (_, mut second) = hub.register("user-2").await;

        hub.notify_all(Event::NewComment(json!({"text": "hello"}))).await;

        assert!(first.try_recv().is_ok());
        assert!(second.try_recv().is_ok());
    }

    #[tokio::test]
    async fn dead_channel_is_pruned_without_touching_siblings() {
        let hub = EventHub::new();
        let (_, dead) = hub.register("user-1").await;
        let (_, mut alive) = hub.register("user-1").await;
        drop(dead);

        hub.notify_user("user-1", end_event()).await;

        assert!(alive.try_recv().is_ok());
        assert_eq!(hub.channel_count("user-1").await, 1);
    }

    #[tokio::test]
    async fn unregistering_the_last_channel_removes_the_user_entry() {
        let hub = EventHub::new();
        let (id, _rx) = hub.register("user-1").await;

        hub.unregister("user-1", id).await;

        assert_eq!(hub.channel_count("user-1").await, 0);
        let channels = hub.channels.read().await;
        assert!(!channels.contains_key("user-1"));
    }

    #[tokio::test]
    async fn concurrent_connects_and_disconnects_keep_counts_exact() {
        let hub = std::sync::Arc::new(EventHub::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let (id, _rx) = hub.register("user-1").await;
                hub.unregister("user-1", id).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(hub.channel_count("user-1").await, 0);
    }
}
