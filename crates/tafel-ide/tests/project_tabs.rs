use std::sync::Arc;

use serde_json::json;

use tafel_core::{ManualClock, Severity};
use tafel_ide::{DocumentSnapshot, MessageList, Project, TabKind};

fn snapshot() -> DocumentSnapshot {
    serde_json::from_value(json!({
        "id": "embed-1",
        "meta": {
            "name": "Sortieren",
            "mainFile": "main.py",
            "language": "python3",
        },
        "code": {
            "main.py": "print('hi')\n",
            "helper.py": { "content": "def helper():\n    pass\n" },
        },
        "mode": "Default",
    }))
    .unwrap()
}

fn project() -> (Project, MessageList, ManualClock) {
    let clock = ManualClock::new();
    let messages = MessageList::new(Arc::new(clock.clone()));
    let project = Project::from_snapshot(snapshot(), Arc::new(clock.clone()), messages.clone());
    (project, messages, clock)
}

#[test]
fn snapshot_opens_files_in_order_with_the_main_file_active() {
    let (project, _messages, _clock) = project();
    let tabs = project.tabs();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs[0].kind.as_file().unwrap().name(), "main.py");
    assert_eq!(tabs[1].kind.as_file().unwrap().name(), "helper.py");
    assert_eq!(project.active_index(), Some(0));
    assert_eq!(
        tabs[1].kind.as_file().unwrap().contents(),
        "def helper():\n    pass\n"
    );
}

#[test]
fn closing_a_file_tab_requires_confirmation() {
    let (project, messages, _clock) = project();
    project.close_tab(1);

    // The tab is still there; a confirm message with two actions is shown.
    assert_eq!(project.tab_count(), 2);
    let shown = messages.messages();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].text, "Wollen Sie diese Datei wirklich löschen?");
    assert_eq!(shown[0].severity, Severity::Warning);
    assert_eq!(shown[0].actions.len(), 2);
    assert_eq!(shown[0].actions[0].label(), "Löschen");
    assert_eq!(shown[0].actions[1].label(), "Abbrechen");

    // Only the confirm action removes the tab and disposes the file.
    let file = project.tabs()[1].kind.as_file().unwrap().clone();
    shown[0].actions[0].run();
    assert_eq!(project.tab_count(), 1);
    assert!(file.is_disposed());
    assert!(messages.messages().is_empty());
}

#[test]
fn cancel_keeps_the_file_tab() {
    let (project, messages, _clock) = project();
    project.close_tab(1);
    let shown = messages.messages();
    shown[0].actions[1].run();
    assert_eq!(project.tab_count(), 2);
    assert!(messages.messages().is_empty());
}

#[test]
fn non_file_tabs_close_immediately() {
    let (project, messages, _clock) = project();
    let index = project.add_tab(TabKind::Process, false);
    assert_eq!(project.tab_count(), 3);

    project.close_tab(index);
    assert_eq!(project.tab_count(), 2);
    assert!(messages.messages().is_empty());
}

#[test]
fn removing_the_active_tab_reactivates_a_neighbor() {
    let (project, _messages, _clock) = project();
    project.switch_tab(1);
    project.remove_tab(1);
    assert_eq!(project.tab_count(), 1);
    assert_eq!(project.active_index(), Some(0));
}

#[test]
fn switch_makes_exactly_one_tab_active_and_toggle_allows_split_view() {
    let (project, _messages, _clock) = project();
    project.switch_tab(1);
    assert_eq!(project.active_index(), Some(1));
    let active: Vec<bool> = project.tabs().iter().map(|tab| tab.active).collect();
    assert_eq!(active, [false, true]);

    project.toggle_tab(0);
    let active: Vec<bool> = project.tabs().iter().map(|tab| tab.active).collect();
    assert_eq!(active, [true, true]);
}

#[test]
fn adding_an_existing_item_focuses_its_tab_instead_of_duplicating() {
    let (project, _messages, _clock) = project();
    let first = project.add_tab(TabKind::Process, true);
    let second = project.add_tab(TabKind::Process, true);
    assert_eq!(first, second);
    assert_eq!(project.tab_count(), 3);
}

#[test]
fn close_callback_runs_when_the_tab_is_removed() {
    let (project, _messages, _clock) = project();
    let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let fired_cb = fired.clone();
    let index = project.add_tab_with_close(TabKind::Insights, false, move || {
        fired_cb.store(true, std::sync::atomic::Ordering::SeqCst);
    });
    project.remove_tab(index);
    assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
}

#[test]
fn unnamed_files_get_sequential_names_in_rename_mode() {
    let (project, _messages, _clock) = project();
    let first = project.add_file(None, "", false);
    let second = project.add_file(None, "", false);
    assert_eq!(first.name(), "Unbenannt0.txt");
    assert_eq!(second.name(), "Unbenannt1.txt");
    assert!(first.is_name_editable());
}

#[test]
fn rename_collision_flags_inconsistency_and_offers_choices() {
    let (project, messages, _clock) = project();
    let helper = project.file_for_name("helper.py").unwrap();
    helper.set_name("main.py");

    assert!(!project.is_consistent());
    let shown = messages.messages();
    assert_eq!(shown.len(), 1);
    assert_eq!(
        shown[0].text,
        "Es existiert bereits eine Datei mit diesem Namen. Was möchten Sie machen?"
    );
    assert_eq!(shown[0].actions[0].label(), "Ersetzen");
    assert_eq!(shown[0].actions[1].label(), "Umbenennen");
}

#[test]
fn replace_removes_every_file_already_bearing_the_name() {
    let (project, messages, _clock) = project();
    // Three files end up named identically: main.py plus two more renames.
    let extra = project.add_file(Some("extra.py"), "", false);
    let helper = project.file_for_name("helper.py").unwrap();
    helper.set_name("main.py");

    // Resolve the first collision by replacing the original main.py.
    messages.messages()[0].actions[0].run();
    assert!(project.is_consistent());
    assert_eq!(project.files().len(), 2);

    extra.set_name("main.py");
    messages.messages()[0].actions[0].run();
    assert!(project.is_consistent());
    let names: Vec<_> = project.files().iter().map(|file| file.name()).collect();
    assert_eq!(names, ["main.py"]);
    assert_eq!(names.len(), 1);
}

#[test]
fn rename_choice_reopens_rename_mode() {
    let (project, messages, _clock) = project();
    let helper = project.file_for_name("helper.py").unwrap();
    helper.set_name("main.py");

    messages.messages()[0].actions[1].run();
    assert!(project.is_consistent());
    assert!(helper.is_name_editable());
    assert_eq!(project.files().len(), 2, "rename keeps both files");
}

#[test]
fn only_one_collision_message_is_in_flight() {
    let (project, messages, _clock) = project();
    let a = project.add_file(Some("a.py"), "", false);
    let b = project.add_file(Some("b.py"), "", false);

    a.set_name("main.py");
    b.set_name("main.py");
    assert_eq!(messages.messages().len(), 1);
    assert!(!project.is_consistent());
}
