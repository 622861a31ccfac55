//! Alert delivery to per-user subscribers.
//!
//! Each user has at most one subscriber, fed through a bounded
//! `tokio::sync::mpsc` channel. Subscribing again replaces the previous
//! subscriber, whose receiver then sees the channel close. Unsubscribing
//! requires the token handed out at subscription.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::alert::Alert;

/// Token identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(Uuid);

impl SubscriptionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Receiving side of a user's alert stream.
#[derive(Debug)]
pub struct AlertSubscription {
    /// User the alerts belong to.
    pub user_id: String,
    /// Token for [`AlertHub::unsubscribe`].
    pub token: SubscriptionToken,
    receiver: mpsc::Receiver<Alert>,
}

impl AlertSubscription {
    /// Next alert; `None` once unsubscribed or replaced.
    pub async fn recv(&mut self) -> Option<Alert> {
        self.receiver.recv().await
    }

    /// Next alert if one is buffered.
    pub fn try_recv(&mut self) -> Option<Alert> {
        self.receiver.try_recv().ok()
    }
}

/// Outcome of publishing an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the subscriber.
    Delivered,
    /// The user has no subscriber.
    NoSubscriber,
    /// The subscriber's buffer is full; the alert was dropped from the stream.
    Dropped,
    /// The subscriber went away and was removed.
    Disconnected,
}

#[derive(Debug)]
struct Subscriber {
    token: SubscriptionToken,
    sender: mpsc::Sender<Alert>,
}

/// Routes alerts to one subscriber per user.
#[derive(Debug)]
pub struct AlertHub {
    buffer: usize,
    subscribers: Mutex<HashMap<String, Subscriber>>,
}

impl Default for AlertHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl AlertHub {
    /// Create a hub whose channels buffer `buffer` alerts.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a user, replacing any existing subscriber.
    pub fn subscribe(&self, user_id: impl Into<String>) -> AlertSubscription {
        let user_id = user_id.into();
        let (sender, receiver) = mpsc::channel(self.buffer);
        let token = SubscriptionToken::new();

        let previous = self
            .subscribers
            .lock()
            .insert(user_id.clone(), Subscriber { token, sender });
        if previous.is_some() {
            tracing::debug!(user_id = %user_id, "Replaced alert subscriber");
        }

        AlertSubscription {
            user_id,
            token,
            receiver,
        }
    }

    /// Remove a subscriber. Only the current token is honoured.
    pub fn unsubscribe(&self, user_id: &str, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.get(user_id) {
            Some(current) if current.token == token => {
                subscribers.remove(user_id);
                tracing::debug!(user_id, "Alert subscriber unsubscribed");
                true
            }
            _ => false,
        }
    }

    /// Whether a user has a live subscriber.
    #[must_use]
    pub fn is_subscribed(&self, user_id: &str) -> bool {
        self.subscribers
            .lock()
            .get(user_id)
            .is_some_and(|s| !s.sender.is_closed())
    }

    /// Publish an alert to its user's subscriber without waiting.
    pub fn publish(&self, alert: &Alert) -> Delivery {
        let mut subscribers = self.subscribers.lock();
        let Some(subscriber) = subscribers.get(&alert.user_id) else {
            return Delivery::NoSubscriber;
        };

        match subscriber.sender.try_send(alert.clone()) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    user_id = %alert.user_id,
                    alert_id = %alert.id,
                    "Alert subscriber buffer full, dropping from stream"
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                subscribers.remove(&alert.user_id);
                tracing::debug!(user_id = %alert.user_id, "Alert subscriber disconnected");
                Delivery::Disconnected
            }
        }
    }
}
