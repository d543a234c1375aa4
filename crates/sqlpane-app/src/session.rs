// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Unauthorized,
    SignedOut,
}

/// Application-wide channel for session changes. Anything that learns the
/// session is gone publishes here; anything holding auth state subscribes.
#[derive(Debug, Clone, Default)]
pub struct SessionBus {
    subscribers: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
}

impl SessionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<SessionEvent>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionBus, SessionEvent};

    #[test]
    fn publish_reaches_every_subscriber() {
        let bus = SessionBus::new();
        let first = bus.subscribe();
        let second = bus.clone().subscribe();

        assert_eq!(bus.publish(SessionEvent::Unauthorized), 2);
        assert_eq!(first.try_recv(), Ok(SessionEvent::Unauthorized));
        assert_eq!(second.try_recv(), Ok(SessionEvent::Unauthorized));
    }

    #[test]
    fn dropped_subscribers_are_pruned_on_publish() {
        let bus = SessionBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(SessionEvent::SignedOut), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(SessionEvent::SignedOut));
    }
}
