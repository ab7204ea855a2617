//! Results-available callback registry with liveness tracking.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::events::{EventSender, ProxyEvent};

/// Identity of a subscriber's remote handle.
///
/// Two registrations with the same token are the same subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken(pub u64);

impl std::fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// External subscriber to "scan results available".
pub trait ScanResultsCallback: Send + Sync {
    /// Stable identity of the subscriber's handle.
    fn token(&self) -> CallbackToken;

    /// New full-band results are in the cache.
    fn on_scan_results_available(&self);

    /// Arm a liveness watch. `recipient` must be fired once the
    /// subscriber's owning process dies.
    ///
    /// Fails with [`crate::Error::CallbackDead`] if the owner is already gone.
    fn link_to_death(&self, recipient: DeathRecipient) -> Result<()>;

    /// Disarm a watch armed by [`Self::link_to_death`].
    fn unlink_to_death(&self, recipient: &DeathRecipient);
}

/// Liveness watch handed to a subscriber.
///
/// Firing it may happen on any thread; it only posts an event to the owner.
#[derive(Debug, Clone)]
pub struct DeathRecipient {
    token: CallbackToken,
    generation: u64,
    events: EventSender,
}

impl DeathRecipient {
    pub fn token(&self) -> CallbackToken {
        self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The watched owner died.
    pub fn binder_died(&self) {
        self.events.post(ProxyEvent::CallbackDied {
            token: self.token,
            generation: self.generation,
        });
    }
}

impl PartialEq for DeathRecipient {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token && self.generation == other.generation
    }
}

struct Registration {
    callback: Arc<dyn ScanResultsCallback>,
    recipient: DeathRecipient,
}

/// Registry of live results callbacks, keyed by token.
///
/// Each registration gets a fresh generation number so a death notice from a
/// replaced registration cannot remove its successor.
pub struct CallbackRegistry {
    entries: HashMap<CallbackToken, Registration>,
    next_generation: u64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Register `callback`, replacing any prior registration with the same token.
    pub fn register(
        &mut self,
        callback: Arc<dyn ScanResultsCallback>,
        events: EventSender,
    ) -> Result<()> {
        let token = callback.token();

        if let Some(previous) = self.entries.remove(&token) {
            debug!(%token, "Replacing results callback");
            previous.callback.unlink_to_death(&previous.recipient);
        }

        self.next_generation += 1;
        let recipient = DeathRecipient {
            token,
            generation: self.next_generation,
            events,
        };

        if let Err(e) = callback.link_to_death(recipient.clone()) {
            warn!(%token, error = %e, "Results callback owner already dead");
            return Err(e);
        }

        self.entries.insert(token, Registration { callback, recipient });
        Ok(())
    }

    /// Remove a registration. Returns whether one existed.
    pub fn unregister(&mut self, token: CallbackToken) -> bool {
        match self.entries.remove(&token) {
            Some(registration) => {
                registration
                    .callback
                    .unlink_to_death(&registration.recipient);
                true
            }
            None => false,
        }
    }

    /// Apply a death notice. Stale notices for replaced registrations are ignored.
    pub fn handle_death(&mut self, token: CallbackToken, generation: u64) -> bool {
        let current = self
            .entries
            .get(&token)
            .is_some_and(|r| r.recipient.generation == generation);

        if current {
            debug!(%token, "Results callback owner died, removing");
            self.entries.remove(&token);
        }
        current
    }

    /// Notify every registered callback once. Returns how many were notified.
    pub fn notify_all(&self) -> usize {
        for registration in self.entries.values() {
            registration.callback.on_scan_results_available();
        }
        self.entries.len()
    }

    pub fn contains(&self, token: CallbackToken) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock subscriber recording every interaction.
    #[derive(Default)]
    struct MockCallback {
        token: u64,
        notified: AtomicUsize,
        unlinked: AtomicUsize,
        dead: AtomicBool,
        recipients: Mutex<Vec<DeathRecipient>>,
    }

    impl MockCallback {
        fn new(token: u64) -> Arc<Self> {
            Arc::new(Self {
                token,
                ..Default::default()
            })
        }

        fn last_recipient(&self) -> DeathRecipient {
            self.recipients.lock().last().cloned().unwrap()
        }
    }

    impl ScanResultsCallback for MockCallback {
        fn token(&self) -> CallbackToken {
            CallbackToken(self.token)
        }

        fn on_scan_results_available(&self) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }

        fn link_to_death(&self, recipient: DeathRecipient) -> Result<()> {
            if self.dead.load(Ordering::SeqCst) {
                return Err(Error::CallbackDead(self.token().to_string()));
            }
            self.recipients.lock().push(recipient);
            Ok(())
        }

        fn unlink_to_death(&self, _recipient: &DeathRecipient) {
            self.unlinked.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fan_out_reaches_every_callback_once() {
        let (sender, _rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let first = MockCallback::new(1);
        let second = MockCallback::new(2);

        registry.register(first.clone(), sender.clone()).unwrap();
        registry.register(second.clone(), sender).unwrap();

        assert_eq!(registry.notify_all(), 2);
        assert_eq!(first.notified.load(Ordering::SeqCst), 1);
        assert_eq!(second.notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_twice_replaces() {
        let (sender, _rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let callback = MockCallback::new(7);

        registry.register(callback.clone(), sender.clone()).unwrap();
        registry.register(callback.clone(), sender).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(callback.recipients.lock().len(), 2);
        assert_eq!(callback.unlinked.load(Ordering::SeqCst), 1);

        registry.notify_all();
        assert_eq!(callback.notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister() {
        let (sender, _rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let callback = MockCallback::new(3);

        registry.register(callback.clone(), sender).unwrap();
        assert!(registry.unregister(CallbackToken(3)));
        assert!(!registry.unregister(CallbackToken(3)));
        assert!(registry.is_empty());
        assert_eq!(callback.unlinked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_death_posts_event_and_removes() {
        let (sender, mut rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let callback = MockCallback::new(4);
        registry.register(callback.clone(), sender).unwrap();

        callback.last_recipient().binder_died();
        // Nothing changes until the owner applies the event.
        assert!(registry.contains(CallbackToken(4)));

        match rx.try_recv().unwrap() {
            ProxyEvent::CallbackDied { token, generation } => {
                assert!(registry.handle_death(token, generation));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!registry.contains(CallbackToken(4)));
        assert_eq!(registry.notify_all(), 0);
    }

    #[test]
    fn test_stale_death_ignored_after_replacement() {
        let (sender, _rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let callback = MockCallback::new(5);

        registry.register(callback.clone(), sender.clone()).unwrap();
        let stale = callback.last_recipient();
        registry.register(callback.clone(), sender).unwrap();

        assert!(!registry.handle_death(stale.token(), stale.generation()));
        assert!(registry.contains(CallbackToken(5)));
    }

    #[test]
    fn test_dead_owner_rejected() {
        let (sender, _rx) = events::channel();
        let mut registry = CallbackRegistry::new();
        let callback = MockCallback::new(6);
        callback.dead.store(true, Ordering::SeqCst);

        assert!(matches!(
            registry.register(callback, sender),
            Err(Error::CallbackDead(_))
        ));
        assert!(registry.is_empty());
    }
}
