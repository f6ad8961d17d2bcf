use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

/// Cache-invalidation capability, called once per pass after any action
/// succeeded or resolved as a conflict, so dependent read caches refetch.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate_caches(&self);
}

type Listener = Box<dyn Fn(usize) + Send + Sync>;

/// Observer registry for pending-count changes.
pub struct ChangeNotifier {
    listeners: Arc<DashMap<u64, Listener>>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener invoked with the new pending count on every
    /// change. Dropping the returned handle does not unsubscribe; call
    /// [`Subscription::unsubscribe`].
    pub fn subscribe(&self, listener: impl Fn(usize) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Box::new(listener));
        Subscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    pub fn notify(&self, pending: usize) {
        for entry in self.listeners.iter() {
            (entry.value())(pending);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    id: u64,
    listeners: Arc<DashMap<u64, Listener>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.listeners.remove(&self.id);
    }
}
