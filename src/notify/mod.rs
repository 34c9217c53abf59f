use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::notification::Notification;

/// Outcome of a single push to one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The user has no open channel; the message is lost.
    Offline,
    /// The channel was full or closed; the message is lost.
    Dropped,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::Delivered => "delivered",
            Delivery::Offline => "offline",
            Delivery::Dropped => "dropped",
        }
    }
}

struct Connection {
    id: u64,
    tx: mpsc::Sender<Notification>,
}

/// A live registration returned by [`ConnectionRegistry::connect`].
pub struct ConnectionHandle {
    pub user_id: Uuid,
    pub connection_id: u64,
    pub receiver: mpsc::Receiver<Notification>,
}

/// Maps each user to at most one open push channel, plus per-ride subscriber
/// lists. Created once at startup and shared through `AppState`.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, Connection>,
    ride_subscribers: DashMap<Uuid, Vec<Uuid>>,
    next_connection_id: AtomicU64,
    buffer_size: usize,
}

impl ConnectionRegistry {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            ride_subscribers: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Registers a channel for `user_id`, replacing (and thereby closing) any
    /// previous one.
    pub fn connect(&self, user_id: Uuid) -> ConnectionHandle {
        let (tx, receiver) = mpsc::channel(self.buffer_size);
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        if let Some(previous) = self
            .connections
            .insert(user_id, Connection { id: connection_id, tx })
        {
            debug!(user_id = %user_id, replaced = previous.id, "replaced existing connection");
        }

        ConnectionHandle {
            user_id,
            connection_id,
            receiver,
        }
    }

    /// Removes the registration only if it still belongs to `connection_id`,
    /// so a stale socket closing cannot evict a newer one.
    pub fn disconnect(&self, user_id: Uuid, connection_id: u64) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, conn| conn.id == connection_id)
            .is_some();

        if removed {
            self.ride_subscribers.iter_mut().for_each(|mut entry| {
                entry.value_mut().retain(|subscriber| *subscriber != user_id);
            });
            self.ride_subscribers.retain(|_, subscribers| !subscribers.is_empty());
        }

        removed
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connected_users(&self) -> Vec<Uuid> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    pub fn subscribe_to_ride(&self, user_id: Uuid, ride_id: Uuid) {
        let mut subscribers = self.ride_subscribers.entry(ride_id).or_default();
        if !subscribers.contains(&user_id) {
            subscribers.push(user_id);
        }
    }

    pub fn ride_subscribers(&self, ride_id: Uuid) -> Vec<Uuid> {
        self.ride_subscribers
            .get(&ride_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Fire-and-forget push. Never blocks on a slow client.
    pub fn send_to_user(&self, user_id: Uuid, notification: Notification) -> Delivery {
        let (connection_id, tx) = match self.connections.get(&user_id) {
            Some(conn) => (conn.id, conn.tx.clone()),
            None => return Delivery::Offline,
        };

        match tx.try_send(notification) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(user_id = %user_id, "notification queue full; dropping message");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                warn!(user_id = %user_id, "notification channel closed; unregistering");
                self.disconnect(user_id, connection_id);
                Delivery::Dropped
            }
        }
    }

    /// Sequential fan-out; a failure for one recipient does not stop the rest.
    pub fn broadcast_to_drivers(
        &self,
        notification: &Notification,
        driver_ids: &[Uuid],
    ) -> Vec<Delivery> {
        driver_ids
            .iter()
            .map(|driver_id| self.send_to_user(*driver_id, notification.clone()))
            .collect()
    }

    pub fn send_ride_update(&self, ride_id: Uuid, notification: &Notification) -> Vec<Delivery> {
        self.ride_subscribers(ride_id)
            .into_iter()
            .map(|user_id| self.send_to_user(user_id, notification.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::{ConnectionRegistry, Delivery};
    use crate::models::notification::{Notification, NotificationKind};

    fn ping() -> Notification {
        Notification::new(NotificationKind::RideUpdate, "ping", json!({}))
    }

    #[test]
    fn send_to_offline_user_is_noop() {
        let registry = ConnectionRegistry::new(4);
        assert_eq!(registry.send_to_user(Uuid::new_v4(), ping()), Delivery::Offline);
    }

    #[tokio::test]
    async fn delivered_message_reaches_receiver() {
        let registry = ConnectionRegistry::new(4);
        let user = Uuid::new_v4();
        let mut handle = registry.connect(user);

        assert_eq!(registry.send_to_user(user, ping()), Delivery::Delivered);
        let received = handle.receiver.recv().await.unwrap();
        assert_eq!(received.kind, NotificationKind::RideUpdate);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let registry = ConnectionRegistry::new(1);
        let user = Uuid::new_v4();
        let _handle = registry.connect(user);

        assert_eq!(registry.send_to_user(user, ping()), Delivery::Delivered);
        assert_eq!(registry.send_to_user(user, ping()), Delivery::Dropped);
        assert!(registry.is_connected(user));
    }

    #[test]
    fn closed_channel_is_unregistered() {
        let registry = ConnectionRegistry::new(4);
        let user = Uuid::new_v4();
        drop(registry.connect(user));

        assert_eq!(registry.send_to_user(user, ping()), Delivery::Dropped);
        assert!(!registry.is_connected(user));
    }

    #[test]
    fn stale_disconnect_keeps_newer_connection() {
        let registry = ConnectionRegistry::new(4);
        let user = Uuid::new_v4();
        let old = registry.connect(user);
        let new = registry.connect(user);

        assert!(!registry.disconnect(user, old.connection_id));
        assert!(registry.is_connected(user));
        assert!(registry.disconnect(user, new.connection_id));
        assert!(!registry.is_connected(user));
    }

    #[test]
    fn broadcast_continues_past_failures() {
        let registry = ConnectionRegistry::new(4);
        let online = Uuid::new_v4();
        let offline = Uuid::new_v4();
        let _handle = registry.connect(online);

        let outcomes = registry.broadcast_to_drivers(&ping(), &[offline, online]);
        assert_eq!(outcomes, vec![Delivery::Offline, Delivery::Delivered]);
    }

    #[test]
    fn disconnect_clears_ride_subscriptions() {
        let registry = ConnectionRegistry::new(4);
        let user = Uuid::new_v4();
        let ride = Uuid::new_v4();
        let handle = registry.connect(user);

        registry.subscribe_to_ride(user, ride);
        registry.subscribe_to_ride(user, ride);
        assert_eq!(registry.ride_subscribers(ride), vec![user]);

        registry.disconnect(user, handle.connection_id);
        assert!(registry.ride_subscribers(ride).is_empty());
    }
}
