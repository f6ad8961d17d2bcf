use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::queue::SharedOutbox;

/// Point-in-time network state. `reachable` is `None` on platforms that
/// never resolve reachability definitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub connected: bool,
    pub reachable: Option<bool>,
}

impl Connectivity {
    pub fn online() -> Self {
        Self {
            connected: true,
            reachable: Some(true),
        }
    }

    pub fn offline() -> Self {
        Self {
            connected: false,
            reachable: Some(false),
        }
    }

    /// Connected and not explicitly unreachable. Unknown reachability
    /// counts as reachable.
    pub fn is_online(&self) -> bool {
        self.connected && self.reachable != Some(false)
    }
}

/// Connectivity probe capability, queried at pass entry and by the
/// mutation facade to pick the online or offline path.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> Connectivity;
}

/// Probe backed by a watch channel, so the same channel feeds both the
/// point-in-time probe and the reconnection trigger.
pub struct WatchProbe {
    rx: watch::Receiver<Connectivity>,
}

impl WatchProbe {
    pub fn new(rx: watch::Receiver<Connectivity>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl ConnectivityProbe for WatchProbe {
    async fn check(&self) -> Connectivity {
        *self.rx.borrow()
    }
}

/// Run a processing pass every time the network state transitions to
/// online, for the lifetime of the sender side. No debouncing beyond the
/// processor's own single-flight guard.
pub fn watch_connectivity(
    outbox: SharedOutbox,
    mut rx: watch::Receiver<Connectivity>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            if state.is_online() {
                tracing::debug!("Connectivity restored, processing action queue");
                outbox.process_queue().await;
            }
        }
        tracing::debug!("Connectivity watcher stopped");
    })
}
