//! Ordered roster of connected peers with apply-then-notify semantics
//!
//! The roster is the single list the presentation layer renders from:
//! insertion order is connection order, duplicates never occur, and every
//! mutation is published to a watch channel before any caller-supplied
//! callback observes it. Callbacks are the hook for work that must see the
//! post-mutation state, like binding a freshly arrived media stream to the
//! surface registered for that peer.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::peer::PeerId;

/// Callback invoked exactly once with the post-mutation roster
pub type AppliedCallback = Box<dyn FnOnce(&[PeerId]) + Send>;

struct RosterInner {
    peers: Mutex<Vec<PeerId>>,
    watch_tx: watch::Sender<Vec<PeerId>>,
}

/// Ordered, duplicate-free list of known participants
///
/// Cheaply cloneable handle; all clones share one list. Mutations happen
/// under an internal lock and are published to the watch channel before the
/// `on_applied` callback runs, so a callback (and anything it triggers) can
/// rely on observers already seeing the state it was handed. Callbacks run
/// while the mutation lock is held and must not call back into the roster.
#[derive(Clone)]
pub struct Roster {
    inner: Arc<RosterInner>,
}

impl Roster {
    /// Create an empty roster
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(RosterInner {
                peers: Mutex::new(Vec::new()),
                watch_tx,
            }),
        }
    }

    /// Apply a pure update function to the roster
    ///
    /// `update` receives the current list and returns the replacement. The
    /// new list is published to all watch subscribers, then `on_applied`
    /// (if given) is invoked exactly once with the published state.
    pub fn apply<F>(&self, update: F, on_applied: Option<AppliedCallback>)
    where
        F: FnOnce(&[PeerId]) -> Vec<PeerId>,
    {
        let mut peers = self.inner.peers.lock().unwrap();
        let next = update(&peers);
        *peers = next.clone();
        self.inner.watch_tx.send_replace(next);
        if let Some(callback) = on_applied {
            callback(&peers);
        }
    }

    /// Replace the roster wholesale
    pub fn replace(&self, next: Vec<PeerId>, on_applied: Option<AppliedCallback>) {
        self.apply(move |_| next, on_applied);
    }

    /// Append `id` unless it is already present
    ///
    /// Returns whether the roster changed. When `id` is already present this
    /// is a full no-op: nothing is published and `on_applied` is dropped
    /// without being invoked.
    pub fn add_if_absent(&self, id: PeerId, on_applied: Option<AppliedCallback>) -> bool {
        let mut peers = self.inner.peers.lock().unwrap();
        if peers.contains(&id) {
            debug!(peer = %id, "roster add skipped, peer already present");
            return false;
        }
        peers.push(id);
        self.inner.watch_tx.send_replace(peers.clone());
        if let Some(callback) = on_applied {
            callback(&peers);
        }
        true
    }

    /// Remove `id` if present; absent ids are a no-op
    pub fn remove(&self, id: &PeerId) {
        self.apply(
            |peers| peers.iter().filter(|p| *p != id).cloned().collect(),
            None,
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.replace(Vec::new(), None);
    }

    /// Subscribe to roster publications
    ///
    /// The receiver's current value is the roster as of subscription time.
    pub fn subscribe(&self) -> watch::Receiver<Vec<PeerId>> {
        self.inner.watch_tx.subscribe()
    }

    /// Copy of the current roster
    pub fn snapshot(&self) -> Vec<PeerId> {
        self.inner.peers.lock().unwrap().clone()
    }

    /// Whether `id` is currently listed
    pub fn contains(&self, id: &PeerId) -> bool {
        self.inner.peers.lock().unwrap().contains(id)
    }

    /// Number of listed peers
    pub fn len(&self) -> usize {
        self.inner.peers.lock().unwrap().len()
    }

    /// True when no peers are listed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_add_preserves_insertion_order() {
        let roster = Roster::new();
        assert!(roster.add_if_absent(PeerId::new("a"), None));
        assert!(roster.add_if_absent(PeerId::new("b"), None));
        assert!(roster.add_if_absent(PeerId::new("c"), None));
        assert_eq!(
            roster.snapshot(),
            vec![PeerId::new("a"), PeerId::new("b"), PeerId::new("c")]
        );
    }

    #[test]
    fn test_add_if_absent_is_idempotent() {
        let roster = Roster::new();
        assert!(roster.add_if_absent(PeerId::new("a"), None));
        assert!(!roster.add_if_absent(PeerId::new("a"), None));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_duplicate_add_does_not_invoke_callback() {
        let roster = Roster::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_first = Arc::clone(&calls);
        roster.add_if_absent(
            PeerId::new("a"),
            Some(Box::new(move |_| {
                calls_first.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let calls_second = Arc::clone(&calls);
        roster.add_if_absent(
            PeerId::new("a"),
            Some(Box::new(move |_| {
                calls_second.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_sees_post_mutation_state() {
        let roster = Roster::new();
        roster.add_if_absent(PeerId::new("a"), None);

        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed_cb = Arc::clone(&observed);
        roster.add_if_absent(
            PeerId::new("b"),
            Some(Box::new(move |peers| {
                *observed_cb.lock().unwrap() = peers.to_vec();
            })),
        );

        assert_eq!(
            *observed.lock().unwrap(),
            vec![PeerId::new("a"), PeerId::new("b")]
        );
    }

    #[test]
    fn test_callback_runs_after_publication() {
        let roster = Roster::new();
        let rx = roster.subscribe();

        let seen_by_subscriber = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&seen_by_subscriber);
        roster.add_if_absent(
            PeerId::new("a"),
            Some(Box::new(move |peers| {
                // Publication happens before the callback, so the watch
                // channel must already hold the state the callback sees.
                *seen.lock().unwrap() = Some(rx.borrow().clone() == peers.to_vec());
            })),
        );

        assert_eq!(*seen_by_subscriber.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_callbacks_fire_in_mutation_order() {
        let roster = Roster::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_first = Arc::clone(&order);
        roster.add_if_absent(
            PeerId::new("a"),
            Some(Box::new(move |peers| {
                order_first.lock().unwrap().push(peers.len());
            })),
        );
        let order_second = Arc::clone(&order);
        roster.add_if_absent(
            PeerId::new("b"),
            Some(Box::new(move |peers| {
                order_second.lock().unwrap().push(peers.len());
            })),
        );

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_remove_filters_and_tolerates_absent() {
        let roster = Roster::new();
        roster.add_if_absent(PeerId::new("a"), None);
        roster.add_if_absent(PeerId::new("b"), None);

        roster.remove(&PeerId::new("a"));
        assert_eq!(roster.snapshot(), vec![PeerId::new("b")]);

        roster.remove(&PeerId::new("ghost"));
        assert_eq!(roster.snapshot(), vec![PeerId::new("b")]);
    }

    #[test]
    fn test_apply_with_replacement() {
        let roster = Roster::new();
        roster.replace(vec![PeerId::local(), PeerId::new("a")], None);
        assert!(roster.contains(&PeerId::local()));
        assert_eq!(roster.len(), 2);

        roster.clear();
        assert!(roster.is_empty());
    }

    #[test]
    fn test_watch_subscriber_observes_changes() {
        let roster = Roster::new();
        let mut rx = roster.subscribe();
        assert!(rx.borrow().is_empty());

        roster.add_if_absent(PeerId::new("a"), None);
        tokio_test::block_on(rx.changed()).unwrap();
        assert_eq!(*rx.borrow_and_update(), vec![PeerId::new("a")]);
    }
}
