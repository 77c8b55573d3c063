//! Explicit listener registration with disposer handles.
//!
//! Replaces implicit event-emitter wiring: every subscription returns a
//! [`Subscription`] that detaches the listener when disposed or dropped,
//! so leaked listeners are visible in the type system.

use std::sync::{Arc, Mutex, Weak};

type ListenerFn<T> = Box<dyn FnMut(&T) + Send>;

struct Slot<T> {
    id: u64,
    callback: Arc<Mutex<ListenerFn<T>>>,
}

struct Registry<T> {
    next_id: u64,
    slots: Vec<Slot<T>>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 1,
            slots: Vec::new(),
        }
    }
}

/// A set of listeners for values of type `T`.
///
/// Emission snapshots the current listeners and invokes them with no
/// registry lock held, so a listener may subscribe, dispose, or re-enter
/// the owning model. Listeners added during an emission are not invoked
/// for that emission.
pub struct ListenerSet<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .inner
            .lock()
            .map(|registry| registry.slots.len())
            .unwrap_or(0);
        f.debug_struct("ListenerSet").field("len", &count).finish()
    }
}

impl<T: 'static> ListenerSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register a listener and return its disposer handle.
    #[must_use]
    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Subscription {
        let mut registry = self.inner.lock().expect("listener registry poisoned");
        let id = registry.next_id;
        registry.next_id += 1;
        registry.slots.push(Slot {
            id,
            callback: Arc::new(Mutex::new(Box::new(callback))),
        });
        drop(registry);

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut registry = inner.lock().expect("listener registry poisoned");
                registry.slots.retain(|slot| slot.id != id);
            }
        })
    }

    /// Invoke every registered listener with `value`.
    ///
    /// A listener that synchronously triggers another emission of the same
    /// set is skipped for that nested emission instead of recursing.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Arc<Mutex<ListenerFn<T>>>> = {
            let registry = self.inner.lock().expect("listener registry poisoned");
            registry
                .slots
                .iter()
                .map(|slot| slot.callback.clone())
                .collect()
        };
        for callback in snapshot {
            if let Ok(mut callback) = callback.try_lock() {
                (callback)(value);
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("listener registry poisoned")
            .slots
            .len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Detach every listener.
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("listener registry poisoned")
            .slots
            .clear();
    }
}

/// Change notification without a payload.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    listeners: ListenerSet<()>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a change listener.
    #[must_use]
    pub fn subscribe(&self, mut callback: impl FnMut() + Send + 'static) -> Subscription {
        self.listeners.subscribe(move |()| callback())
    }

    /// Notify every change listener.
    pub fn notify(&self) {
        self.listeners.emit(&());
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Detach every listener.
    pub fn clear(&self) {
        self.listeners.clear();
    }
}

/// Disposer handle for a registered listener.
///
/// The listener is detached when the handle is disposed or dropped. Call
/// [`Subscription::forget`] to keep the listener for the lifetime of its
/// [`ListenerSet`].
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach the listener now.
    pub fn dispose(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Keep the listener registered without holding the handle.
    pub fn forget(mut self) {
        self.detach = None;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emits_to_registered_listeners() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_listener = seen.clone();
        let sub = set.subscribe(move |value| {
            seen_listener.fetch_add(*value as usize, Ordering::SeqCst);
        });
        set.emit(&3);
        set.emit(&4);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        drop(sub);
    }

    #[test]
    fn dropping_subscription_detaches_listener() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_listener = count.clone();
        let sub = notifier.subscribe(move || {
            count_listener.fetch_add(1, Ordering::SeqCst);
        });
        notifier.notify();
        drop(sub);
        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(notifier.is_empty());
    }

    #[test]
    fn forgotten_subscription_stays_registered() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_listener = count.clone();
        notifier
            .subscribe(move || {
                count_listener.fetch_add(1, Ordering::SeqCst);
            })
            .forget();
        notifier.notify();
        notifier.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_reenter_the_set() {
        let notifier = ChangeNotifier::new();
        let inner = notifier.clone();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_listener = fired.clone();
        let sub = notifier.subscribe(move || {
            // Subscribing from within an emission must not deadlock.
            let fired_nested = fired_listener.clone();
            inner
                .subscribe(move || {
                    fired_nested.fetch_add(1, Ordering::SeqCst);
                })
                .forget();
        });
        notifier.notify();
        notifier.notify();
        // First notify adds one listener, second notify fires it (and adds two more).
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        drop(sub);
    }
}
