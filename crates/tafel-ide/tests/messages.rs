use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tafel_core::{ManualClock, MessageAction, Severity};
use tafel_ide::{MessageContent, MessageList, MessageListOptions};

fn list() -> (MessageList, ManualClock) {
    let clock = ManualClock::new();
    let list = MessageList::new(Arc::new(clock.clone()));
    (list, clock)
}

#[test]
fn identical_texts_collapse_into_one_entry_with_count() {
    let (list, _clock) = list();
    let _ = list.show_message(Severity::Info, "Datei gespeichert");
    let _ = list.show_message(Severity::Info, "Datei gespeichert");

    let messages = list.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].count, 2);
}

#[test]
fn list_caps_at_the_most_recent_max_messages() {
    let (list, _clock) = list();
    for index in 0..7 {
        let _ = list.show_message(Severity::Info, format!("Meldung {index}"));
    }

    let messages = list.messages();
    assert_eq!(messages.len(), 5);
    // Newest-first: the oldest two were dropped.
    assert_eq!(messages[0].text, "Meldung 6");
    assert_eq!(messages[4].text, "Meldung 2");
}

#[test]
fn purge_removes_undismissed_messages_without_actions() {
    let (list, clock) = list();
    let _ = list.show_message(Severity::Info, "nur zur Info");
    let _ = list.show_message(Severity::Error, "echtes Problem");
    let _ = list.show_message(
        Severity::Warning,
        MessageContent::WithActions {
            text: "bitte bestätigen".to_string(),
            actions: vec![MessageAction::new("a", "Ok", || {})],
        },
    );

    // Before the purge deadline, nothing happens.
    clock.advance(Duration::from_secs(9));
    list.tick();
    assert_eq!(list.messages().len(), 3);

    clock.advance(Duration::from_secs(2));
    list.tick();
    let texts: Vec<String> = list.messages().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, ["bitte bestätigen", "echtes Problem"]);
}

#[test]
fn each_show_reschedules_the_purge() {
    let (list, clock) = list();
    let _ = list.show_message(Severity::Info, "erste");
    clock.advance(Duration::from_secs(8));
    // The second show pushes the purge deadline out again.
    let _ = list.show_message(Severity::Info, "zweite");
    clock.advance(Duration::from_secs(8));
    list.tick();
    assert_eq!(list.messages().len(), 2);

    clock.advance(Duration::from_secs(2));
    list.tick();
    assert!(list.messages().is_empty());
}

#[test]
fn ignore_severity_auto_dismisses_after_three_seconds() {
    let (list, clock) = list();
    let _ = list.show_message(Severity::Ignore, "Speichere...");
    assert_eq!(list.messages().len(), 1);

    clock.advance(Duration::from_secs(2));
    list.tick();
    assert_eq!(list.messages().len(), 1);

    clock.advance(Duration::from_secs(1));
    list.tick();
    assert!(list.messages().is_empty());
}

#[test]
fn messages_without_actions_get_a_default_close_action() {
    let (list, _clock) = list();
    let _ = list.show_message(Severity::Info, "Hinweis");

    let messages = list.messages();
    assert_eq!(messages[0].actions.len(), 1);
    assert_eq!(messages[0].actions[0].id(), "close.message.action");
    assert_eq!(messages[0].actions[0].label(), "Schließen");

    // Running the close action hides the message.
    messages[0].actions[0].run();
    assert!(list.messages().is_empty());
}

#[test]
fn dismiss_handle_hides_the_shown_messages() {
    let (list, _clock) = list();
    let handle = list.show_message(
        Severity::Info,
        MessageContent::Many(vec!["eins".into(), "zwei".into()]),
    );
    assert_eq!(list.messages().len(), 2);
    handle.dismiss();
    assert!(list.messages().is_empty());
}

#[test]
fn hide_by_text_removes_every_duplicate() {
    let (list, _clock) = list();
    let _ = list.show_message(Severity::Info, "doppelt");
    let _ = list.show_message(Severity::Info, "doppelt");
    let _ = list.show_message(Severity::Info, "bleibt");

    list.hide_message("doppelt");
    let messages = list.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "bleibt");
}

#[test]
fn empty_text_is_a_no_op() {
    let (list, _clock) = list();
    let handle = list.show_message(Severity::Info, "");
    handle.dismiss();
    assert!(list.messages().is_empty());
}

#[test]
fn structural_changes_emit_exactly_one_change_each() {
    let (list, clock) = list();
    let changes = Arc::new(AtomicUsize::new(0));
    let changes_cb = changes.clone();
    let _sub = list.on_change(move || {
        changes_cb.fetch_add(1, Ordering::SeqCst);
    });

    let _ = list.show_message(Severity::Info, "eine");
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    list.hide_message("eine");
    assert_eq!(changes.load(Ordering::SeqCst), 2);

    // A tick with nothing to do stays silent.
    clock.advance(Duration::from_secs(1));
    list.tick();
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[test]
fn custom_options_are_respected() {
    let clock = ManualClock::new();
    let list = MessageList::with_options(
        Arc::new(clock.clone()),
        MessageListOptions {
            purge_interval: Duration::from_secs(1),
            max_messages: 2,
            dismiss_after: Duration::from_millis(500),
        },
    );
    let _ = list.show_message(Severity::Info, "a");
    let _ = list.show_message(Severity::Info, "b");
    let _ = list.show_message(Severity::Info, "c");
    assert_eq!(list.messages().len(), 2);

    clock.advance(Duration::from_secs(2));
    list.tick();
    assert!(list.messages().is_empty());
}
