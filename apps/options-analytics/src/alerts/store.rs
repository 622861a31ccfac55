//! Per-user alert retention.

use std::collections::VecDeque;
use uuid::Uuid;

use super::alert::Alert;

/// Fixed-capacity ring of a user's alerts; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct AlertStore {
    capacity: usize,
    alerts: VecDeque<Alert>,
}

impl AlertStore {
    /// Create an empty store. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            alerts: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an alert, returning the evicted one when full.
    pub fn push(&mut self, alert: Alert) -> Option<Alert> {
        let evicted = if self.alerts.len() == self.capacity {
            self.alerts.pop_front()
        } else {
            None
        };
        self.alerts.push_back(alert);
        evicted
    }

    /// Look up an alert for mutation.
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Alert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }

    /// Alerts, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().rev()
    }

    /// Alerts not yet read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.is_read).count()
    }

    /// Number of retained alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Maximum retained alerts.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
