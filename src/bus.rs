//! Activity signal bus - fire-and-forget pub/sub
//!
//! `publish` delivers synchronously to every listener subscribed to that kind
//! at the moment of the call. There is no queue: a signal published with no
//! listeners is simply lost. Listeners are invoked outside the registry lock,
//! so a listener may publish or unsubscribe from inside its own callback.

use crate::observer::{Signal, SignalObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Publish/subscribe capability injected into renderers.
pub trait SignalBus {
    /// Deliver `signal` to every current subscriber of its kind.
    fn publish(&self, signal: Signal);

    /// Register `observer` for `kind`. Dropping the returned handle unsubscribes.
    fn subscribe(&self, kind: Signal, observer: Arc<dyn SignalObserver>) -> Subscription;
}

/// Handle for a live subscription.
///
/// Unsubscribes when dropped or when [`unsubscribe`](Self::unsubscribe) is
/// called, whichever happens first.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

struct Listener {
    id: u64,
    kind: Signal,
    observer: Arc<dyn SignalObserver>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// In-process bus shared by cloning.
#[derive(Clone, Default)]
pub struct LocalSignalBus {
    registry: Arc<Mutex<Registry>>,
}

impl LocalSignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live listeners across both kinds.
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }

    /// Number of live listeners for `kind`.
    pub fn listeners_for(&self, kind: Signal) -> usize {
        lock(&self.registry)
            .listeners
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }
}

impl SignalBus for LocalSignalBus {
    fn publish(&self, signal: Signal) {
        let targets: Vec<Arc<dyn SignalObserver>> = lock(&self.registry)
            .listeners
            .iter()
            .filter(|l| l.kind == signal)
            .map(|l| l.observer.clone())
            .collect();

        tracing::trace!(%signal, listeners = targets.len(), "publish");
        for observer in targets {
            observer.on_signal(signal);
        }
    }

    fn subscribe(&self, kind: Signal, observer: Arc<dyn SignalObserver>) -> Subscription {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push(Listener { id, kind, observer });
            id
        };

        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                lock(&registry).listeners.retain(|l| l.id != id);
            }
        })
    }
}

fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signals received since the last drain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pending {
    pub pulses: usize,
    pub spikes: usize,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.pulses == 0 && self.spikes == 0
    }
}

/// Per-kind arrival counters shared between the bus and one inbox.
#[derive(Default)]
struct InboxCounter {
    pulses: AtomicUsize,
    spikes: AtomicUsize,
}

impl SignalObserver for InboxCounter {
    fn on_signal(&self, signal: Signal) {
        let slot = match signal {
            Signal::TypingPulse => &self.pulses,
            Signal::ErrorSpike => &self.spikes,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }
}

/// A renderer's mailbox on the bus.
///
/// Subscribes one counting observer to both signal kinds. The owning
/// renderer drains it once per frame, so the intensity state it feeds is only
/// ever touched from the frame callback. Memory stays fixed however long the
/// inbox goes undrained. Dropping the inbox unsubscribes.
pub struct SignalInbox {
    counter: Arc<InboxCounter>,
    subscriptions: Vec<Subscription>,
}

impl SignalInbox {
    /// Subscribe a fresh inbox to every signal kind on `bus`.
    pub fn attach<B: SignalBus + ?Sized>(bus: &B) -> Self {
        let counter = Arc::new(InboxCounter::default());
        let observer: Arc<dyn SignalObserver> = counter.clone();
        let subscriptions = Signal::ALL
            .iter()
            .map(|&kind| bus.subscribe(kind, observer.clone()))
            .collect();

        Self {
            counter,
            subscriptions,
        }
    }

    /// Take everything received since the previous drain.
    pub fn drain(&self) -> Pending {
        Pending {
            pulses: self.counter.pulses.swap(0, Ordering::Relaxed),
            spikes: self.counter.spikes.swap(0, Ordering::Relaxed),
        }
    }

    /// Unsubscribe from the bus and discard anything not yet drained.
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}
