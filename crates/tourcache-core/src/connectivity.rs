//! Connectivity monitor.
//!
//! Turns platform network callbacks into a deduplicated stream of
//! connected/disconnected states. The platform side is abstracted behind
//! [`NetworkCallbackRegistry`]: the monitor registers a [`ConnectivitySink`]
//! when the first subscriber arrives and unregisters it when the last one is
//! dropped.
//!
//! "Connected" requires a network that both offers internet capability and
//! has been validated; anything else, including no network at all, is
//! reported as disconnected.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream};
use tokio::sync::watch;
use tracing::debug;

/// Capabilities reported by the platform for the default network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCapabilities {
    pub has_internet: bool,
    pub validated: bool,
}

impl NetworkCapabilities {
    pub fn online() -> Self {
        Self {
            has_internet: true,
            validated: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.has_internet && self.validated
    }
}

/// Host platform network-state API.
pub trait NetworkCallbackRegistry: Send + Sync {
    /// Start delivering callbacks to `sink`
    fn register(&self, sink: ConnectivitySink);

    /// Stop delivering callbacks to the sink registered last
    fn unregister(&self);

    /// Capabilities of the active network right now, `None` when there is none
    fn active_network(&self) -> Option<NetworkCapabilities>;
}

/// Callback target handed to the platform.
#[derive(Clone)]
pub struct ConnectivitySink {
    tx: watch::Sender<bool>,
}

impl ConnectivitySink {
    pub fn on_available(&self, capabilities: NetworkCapabilities) {
        self.publish(capabilities.is_connected());
    }

    pub fn on_capabilities_changed(&self, capabilities: NetworkCapabilities) {
        self.publish(capabilities.is_connected());
    }

    pub fn on_lost(&self) {
        self.publish(false);
    }

    fn publish(&self, connected: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            debug!(connected, "Connectivity changed");
        }
    }
}

struct MonitorInner {
    registry: Arc<dyn NetworkCallbackRegistry>,
    tx: watch::Sender<bool>,
    subscribers: Mutex<usize>,
}

/// Clone is cheap; clones share subscribers and the platform registration.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl ConnectivityMonitor {
    pub fn new(registry: Arc<dyn NetworkCallbackRegistry>) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(MonitorInner {
                registry,
                tx,
                subscribers: Mutex::new(0),
            }),
        }
    }

    /// Point query against the platform. No side effects.
    pub fn is_connected_now(&self) -> bool {
        self.inner
            .registry
            .active_network()
            .map(|caps| caps.is_connected())
            .unwrap_or(false)
    }

    /// Subscribe to connectivity changes.
    ///
    /// The first item is the current state; after that only transitions are
    /// emitted, never the same value twice in a row.
    pub fn observe(&self) -> ConnectivityStream {
        {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *subscribers == 0 {
                self.inner.tx.send_replace(self.is_connected_now());
                self.inner.registry.register(ConnectivitySink {
                    tx: self.inner.tx.clone(),
                });
                debug!("Registered network callback");
            }
            *subscribers += 1;
        }

        let rx = self.inner.tx.subscribe();
        let states = stream::unfold((rx, None::<bool>), |(mut rx, last)| async move {
            loop {
                if last.is_some() && rx.changed().await.is_err() {
                    return None;
                }
                let current = *rx.borrow_and_update();
                if last != Some(current) {
                    return Some((current, (rx, Some(current))));
                }
            }
        });

        ConnectivityStream {
            states: Box::pin(states),
            _guard: SubscriberGuard {
                inner: Arc::clone(&self.inner),
            },
        }
    }

    pub fn subscriber_count(&self) -> usize {
        *self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct SubscriberGuard {
    inner: Arc<MonitorInner>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *subscribers = subscribers.saturating_sub(1);
        if *subscribers == 0 {
            self.inner.registry.unregister();
            debug!("Unregistered network callback");
        }
    }
}

/// Stream of connectivity states returned by [`ConnectivityMonitor::observe`].
/// Dropping it releases the subscription.
pub struct ConnectivityStream {
    states: BoxStream<'static, bool>,
    _guard: SubscriberGuard,
}

impl Stream for ConnectivityStream {
    type Item = bool;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<bool>> {
        self.states.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-process stand-in for the platform network API
    #[derive(Default)]
    pub struct FakeNetwork {
        pub sink: Mutex<Option<ConnectivitySink>>,
        pub active: Mutex<Option<NetworkCapabilities>>,
        pub registrations: Mutex<usize>,
        pub unregistrations: Mutex<usize>,
    }

    impl FakeNetwork {
        pub fn with_active(active: Option<NetworkCapabilities>) -> Arc<Self> {
            let network = Self::default();
            *network.active.lock().unwrap() = active;
            Arc::new(network)
        }

        pub fn set_active(&self, active: Option<NetworkCapabilities>) {
            *self.active.lock().unwrap() = active;
        }

        /// Simulate a platform callback, updating the active network too
        pub fn signal(&self, active: Option<NetworkCapabilities>) {
            self.set_active(active);
            let sink = self.sink.lock().unwrap().clone();
            if let Some(sink) = sink {
                match active {
                    Some(caps) => sink.on_capabilities_changed(caps),
                    None => sink.on_lost(),
                }
            }
        }
    }

    impl NetworkCallbackRegistry for FakeNetwork {
        fn register(&self, sink: ConnectivitySink) {
            *self.sink.lock().unwrap() = Some(sink);
            *self.registrations.lock().unwrap() += 1;
        }

        fn unregister(&self) {
            *self.sink.lock().unwrap() = None;
            *self.unregistrations.lock().unwrap() += 1;
        }

        fn active_network(&self) -> Option<NetworkCapabilities> {
            *self.active.lock().unwrap()
        }
    }
}
