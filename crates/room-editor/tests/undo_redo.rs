//! Integration tests: snapshot undo/redo through the room (room-editor).

use pretty_assertions::assert_eq;
use room_core::document::GraphDocument;
use room_core::{BoxId, Point, RoomError};
use room_editor::history::Snapshot;
use room_editor::notify::RoomEvent;
use room_editor::{InputEvent, ManualClock, Room};
use room_render::headless::HeadlessRenderer;
use std::cell::RefCell;
use std::rc::Rc;

type TestRoom = Room<HeadlessRenderer, ManualClock>;

fn setup() -> TestRoom {
    let _ = env_logger::builder().is_test(true).try_init();
    Room::with_clock(HeadlessRenderer::new(), ManualClock::new()).unwrap()
}

fn create_row(room: &mut TestRoom, n: usize) -> Vec<BoxId> {
    (0..n)
        .map(|i| room.create_box(Point::new(100.0 + 200.0 * i as f64, 100.0)).unwrap())
        .collect()
}

// ─── Basic undo/redo ────────────────────────────────────────────────────

#[test]
fn undo_restores_previous_operation_and_redo_reapplies() {
    let mut room = setup();
    let mut after: Vec<GraphDocument> = vec![room.serialize_state()];
    for i in 0..3 {
        room.create_box(Point::new(100.0 * i as f64, 0.0)).unwrap();
        after.push(room.serialize_state());
    }

    assert!(room.undo().unwrap());
    assert_eq!(room.serialize_state(), after[2]);
    assert!(room.redo().unwrap());
    assert_eq!(room.serialize_state(), after[3]);

    while room.undo().unwrap() {}
    assert_eq!(room.serialize_state(), after[0]);
    assert!(room.graph().is_empty());
}

#[test]
fn undo_and_redo_at_the_ends_are_no_ops() {
    let mut room = setup();
    assert!(!room.undo().unwrap());
    assert!(!room.redo().unwrap());

    create_row(&mut room, 1);
    assert!(!room.redo().unwrap());
}

#[test]
fn new_operation_discards_redo_tail() {
    let mut room = setup();
    let ids = create_row(&mut room, 2);

    room.undo().unwrap();
    assert!(room.can_redo());
    let c = room.create_box(Point::new(0.0, 500.0)).unwrap();

    assert!(!room.can_redo());
    assert_eq!(room.graph().box_ids(), vec![ids[0], c]);
}

#[test]
fn history_caps_at_fifty_snapshots() {
    let mut room = setup();
    create_row(&mut room, 60);
    assert_eq!(room.history().len(), 50);

    let mut depth = 0;
    while room.undo().unwrap() {
        depth += 1;
    }
    assert_eq!(depth, 49);
    // The oldest surviving snapshot is the state after op 11
    assert_eq!(room.graph().len(), 11);
}

#[test]
fn undo_of_remove_box_restores_its_arrows() {
    let mut room = setup();
    let ids = create_row(&mut room, 3);
    room.create_arrow(ids[0], ids[1]).unwrap();
    room.create_arrow(ids[2], ids[0]).unwrap();

    assert!(room.remove_box(ids[0]).unwrap());
    assert_eq!(room.graph().arrow_count(), 0);

    room.undo().unwrap();
    assert!(room.graph().find_arrow(ids[0], ids[1]).is_some());
    assert!(room.graph().find_arrow(ids[2], ids[0]).is_some());
    assert_eq!(room.renderer().arrow_count(), 2);
    assert_eq!(room.renderer().box_count(), 3);
}

#[test]
fn batch_delete_is_one_snapshot() {
    let mut room = setup();
    create_row(&mut room, 3);
    room.select_all();
    let depth = room.history().len();

    assert!(room.delete_selection().unwrap());
    assert_eq!(room.history().len(), depth + 1);
    assert!(room.graph().is_empty());

    room.undo().unwrap();
    assert_eq!(room.graph().len(), 3);
}

#[test]
fn undo_prunes_selection() {
    let mut room = setup();
    let ids = create_row(&mut room, 1);
    room.select_box(ids[0], false);

    room.undo().unwrap();
    assert!(room.selected_boxes().is_empty());
    assert!(room.renderer().selection.is_empty());
}

#[test]
fn undo_while_editing_commits_then_reverts_the_edit() {
    let mut room = setup();
    let ids = create_row(&mut room, 1);
    room.begin_edit(ids[0]).unwrap();
    room.set_edit_text("typed");

    assert!(room.undo().unwrap());
    assert_eq!(room.graph().get(ids[0]).unwrap().text, "");
    assert!(room.redo().unwrap());
    assert_eq!(room.graph().get(ids[0]).unwrap().text, "typed");
}

#[test]
fn undo_via_shortcut() {
    let mut room = setup();
    create_row(&mut room, 2);

    let undo = InputEvent::Key {
        key: "z".into(),
        modifiers: room_editor::Modifiers::CTRL,
    };
    assert!(room.handle(undo).unwrap());
    assert_eq!(room.graph().len(), 1);
}

// ─── Corruption ─────────────────────────────────────────────────────────

#[test]
fn corrupt_snapshot_is_an_error_and_leaves_graph_untouched() {
    let mut room = setup();
    create_row(&mut room, 3);
    let before = room.serialize_state();
    let pointer = room.history().pointer();

    assert!(
        room.history_mut()
            .replace(pointer - 1, Snapshot::from_bytes(vec![0xc1, 0xff], "bad"))
    );
    let err = room.undo().unwrap_err();
    assert!(matches!(err, RoomError::CorruptSnapshot(_)), "{err}");

    assert_eq!(room.serialize_state(), before);
    assert_eq!(room.history().pointer(), pointer);
}

// ─── Dirty flag & observers ─────────────────────────────────────────────

#[test]
fn dirty_flag_follows_commits_saves_and_loads() {
    let mut room = setup();
    assert!(!room.is_dirty());

    create_row(&mut room, 1);
    assert!(room.is_dirty());
    room.mark_saved();
    assert!(!room.is_dirty());
    room.undo().unwrap();
    assert!(room.is_dirty());

    room.load_json(include_str!("fixtures/quad.json")).unwrap();
    assert!(!room.is_dirty());
    assert!(!room.can_undo());
    assert_eq!(room.graph().len(), 4);
    assert_eq!(room.renderer().box_count(), 4);
}

#[test]
fn observers_see_dirty_and_history_changes() {
    let mut room = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let sub = room.subscribe(Box::new(move |e: &RoomEvent| sink.borrow_mut().push(e.clone())));

    create_row(&mut room, 1);
    assert_eq!(
        *seen.borrow(),
        vec![
            RoomEvent::DirtyChanged(true),
            RoomEvent::HistoryChanged {
                can_undo: true,
                can_redo: false
            },
        ]
    );

    seen.borrow_mut().clear();
    room.mark_saved();
    assert_eq!(*seen.borrow(), vec![RoomEvent::DirtyChanged(false)]);

    assert!(room.unsubscribe(sub));
    seen.borrow_mut().clear();
    create_row(&mut room, 1);
    assert!(seen.borrow().is_empty());
}
