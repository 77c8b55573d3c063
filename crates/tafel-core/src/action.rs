//! Message actions attached to notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use smol_str::SmolStr;

type ActionFn = Box<dyn FnMut() + Send>;

/// An action offered next to a message (confirm, cancel, close, ...).
///
/// The handler runs at most as long as the action is not disposed;
/// invoking a disposed action is a no-op. The handler is invoked with no
/// internal lock held, so it may dispose its own action (the usual
/// "confirm and hide the message" flow).
#[derive(Clone)]
pub struct MessageAction {
    id: SmolStr,
    label: SmolStr,
    enabled: bool,
    disposed: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<ActionFn>>>,
}

impl MessageAction {
    pub fn new(
        id: impl Into<SmolStr>,
        label: impl Into<SmolStr>,
        handler: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: true,
            disposed: Arc::new(AtomicBool::new(false)),
            handler: Arc::new(Mutex::new(Some(Box::new(handler)))),
        }
    }

    #[must_use]
    pub fn id(&self) -> &SmolStr {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> &SmolStr {
        &self.label
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Invoke the handler, if the action is still live.
    pub fn run(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let handler = self
            .handler
            .lock()
            .expect("action handler poisoned")
            .take();
        let Some(mut handler) = handler else {
            return;
        };
        handler();
        if !self.disposed.load(Ordering::SeqCst) {
            let mut guard = self.handler.lock().expect("action handler poisoned");
            if guard.is_none() {
                *guard = Some(handler);
            }
        }
    }

    /// Drop the handler; further `run` calls do nothing.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.handler
            .lock()
            .expect("action handler poisoned")
            .take();
    }
}

impl std::fmt::Debug for MessageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageAction")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enabled", &self.enabled)
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn disposed_action_no_longer_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_handler = count.clone();
        let action = MessageAction::new("close.message.action", "Schließen", move || {
            count_handler.fetch_add(1, Ordering::SeqCst);
        });
        action.run();
        action.dispose();
        action.run();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_dispose_its_own_action() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_handler = count.clone();
        let slot: Arc<Mutex<Option<MessageAction>>> = Arc::new(Mutex::new(None));
        let slot_handler = slot.clone();
        let action = MessageAction::new("delete.message.action", "Löschen", move || {
            count_handler.fetch_add(1, Ordering::SeqCst);
            if let Some(action) = slot_handler.lock().unwrap().as_ref() {
                action.dispose();
            }
        });
        *slot.lock().unwrap() = Some(action.clone());
        action.run();
        action.run();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
