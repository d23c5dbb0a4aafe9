//! Integration tests: pointer gestures through the interaction state
//! machine (room-editor).
//!
//! Time is driven by a `ManualClock`, so hold and double-click windows
//! are exact.

use pretty_assertions::assert_eq;
use room_core::{BoxId, Point, Size};
use room_editor::input::{InputEvent, Modifiers, PointerButton};
use room_editor::room::MenuAction;
use room_editor::state::StateKind;
use room_editor::{ManualClock, Room};
use room_render::adapter::{Cursor, Feedback, MenuKind};
use room_render::headless::HeadlessRenderer;

type TestRoom = Room<HeadlessRenderer, ManualClock>;

fn setup() -> (TestRoom, ManualClock) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = ManualClock::new();
    let room = Room::with_clock(HeadlessRenderer::new(), clock.clone()).unwrap();
    (room, clock)
}

/// One default box centered at (100, 100): rect (20, 60)–(180, 140).
fn with_box() -> (TestRoom, ManualClock, BoxId) {
    let (mut room, clock) = setup();
    let id = room.create_box(Point::new(100.0, 100.0)).unwrap();
    (room, clock, id)
}

fn primary(x: f64, y: f64) -> InputEvent {
    InputEvent::down(x, y, PointerButton::Primary)
}

fn click(room: &mut TestRoom, x: f64, y: f64) {
    room.handle(primary(x, y)).unwrap();
    room.handle(InputEvent::up(x, y)).unwrap();
}

// ─── Hold threshold ─────────────────────────────────────────────────────

#[test]
fn holding_still_then_dragging_moves_the_box() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::SelectingBox);
    assert_eq!(room.selected_boxes(), &[id]);

    clock.advance(200);
    room.handle(InputEvent::moved(150.0, 120.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::MovingBoxes);
    assert_eq!(room.renderer().cursor, Cursor::Move);
    assert_eq!(room.graph().get(id).unwrap().position, Point::new(70.0, 80.0));

    room.handle(InputEvent::up(150.0, 120.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.renderer().cursor, Cursor::Default);
    // base + create + one move
    assert_eq!(room.history().len(), 3);
}

#[test]
fn motion_before_threshold_never_starts_a_drag() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    clock.advance(50);
    room.handle(InputEvent::moved(120.0, 100.0)).unwrap();
    clock.advance(500);
    room.handle(InputEvent::moved(160.0, 100.0)).unwrap();

    assert_eq!(room.state_kind(), StateKind::SelectingBox);
    assert_eq!(room.graph().get(id).unwrap().position, Point::new(20.0, 60.0));

    room.handle(InputEvent::up(160.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.history().len(), 2);
}

#[test]
fn jitter_within_slop_keeps_the_pending_drag() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    clock.advance(50);
    room.handle(InputEvent::moved(102.0, 101.0)).unwrap();
    clock.advance(150);
    room.handle(InputEvent::moved(150.0, 120.0)).unwrap();

    assert_eq!(room.state_kind(), StateKind::MovingBoxes);
    // The drag starts from where the pointer rested when the hold fired
    assert_eq!(room.graph().get(id).unwrap().position, Point::new(68.0, 79.0));
}

#[test]
fn tick_fires_the_hold_without_input() {
    let (mut room, clock, _) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    clock.advance(199);
    assert!(!room.tick().unwrap());
    clock.advance(1);
    assert!(room.tick().unwrap());
    assert_eq!(room.state_kind(), StateKind::MovingBoxes);

    // Leaving the canvas aborts; nothing moved, so nothing is committed
    room.handle(InputEvent::PointerLeave).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.history().len(), 2);
}

#[test]
fn leaving_mid_drag_keeps_and_commits_the_move() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    clock.advance(250);
    room.handle(InputEvent::moved(130.0, 100.0)).unwrap();
    room.handle(InputEvent::PointerLeave).unwrap();

    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.graph().get(id).unwrap().position, Point::new(50.0, 60.0));
    assert_eq!(room.history().len(), 3);
}

#[test]
fn hold_on_resize_handle_resizes() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(175.0, 135.0)).unwrap();
    clock.advance(200);
    room.handle(InputEvent::moved(215.0, 155.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::ResizingBox);
    room.handle(InputEvent::moved(215.0, 165.0)).unwrap();
    assert_eq!(room.graph().get(id).unwrap().size, Size::new(200.0, 110.0));
    // Live updates don't commit
    assert_eq!(room.history().len(), 2);

    room.handle(InputEvent::up(215.0, 165.0)).unwrap();
    assert_eq!(room.history().len(), 3);
}

#[test]
fn resize_clamps_to_minimum() {
    let (mut room, clock, id) = with_box();

    room.handle(primary(175.0, 135.0)).unwrap();
    clock.advance(200);
    room.handle(InputEvent::moved(175.0, 135.0)).unwrap();
    room.handle(InputEvent::moved(-500.0, -500.0)).unwrap();
    assert_eq!(room.graph().get(id).unwrap().size, Size::new(16.0, 16.0));
}

#[test]
fn auxiliary_hold_on_canvas_pans() {
    let (mut room, clock) = setup();

    room.handle(InputEvent::down(600.0, 400.0, PointerButton::Auxiliary))
        .unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    clock.advance(200);
    room.handle(InputEvent::moved(650.0, 420.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::Panning);
    assert_eq!(room.viewport().0, room_core::Vec2::new(50.0, 20.0));
    assert_eq!(room.renderer().viewport.0, room_core::Vec2::new(50.0, 20.0));

    room.handle(InputEvent::up(650.0, 420.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    // Pointer now maps through the pan offset
    assert_eq!(room.screen_to_graph(Point::new(50.0, 20.0)), Point::ZERO);
}

#[test]
fn presses_are_ignored_while_dragging() {
    let (mut room, clock, _) = with_box();

    room.handle(primary(100.0, 100.0)).unwrap();
    clock.advance(200);
    room.tick().unwrap();
    assert!(!room.handle(primary(500.0, 500.0)).unwrap());
    assert!(
        !room
            .handle(InputEvent::down(500.0, 500.0, PointerButton::Secondary))
            .unwrap()
    );
    assert_eq!(room.state_kind(), StateKind::MovingBoxes);
}

// ─── Double click ───────────────────────────────────────────────────────

#[test]
fn double_click_on_text_starts_editing() {
    let (mut room, clock, id) = with_box();

    click(&mut room, 100.0, 100.0);
    clock.advance(120);
    room.handle(primary(100.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::EditingBox);
    assert_eq!(room.renderer().editing, Some(id));
    room.handle(InputEvent::up(100.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::EditingBox);

    assert!(room.set_edit_text("hello"));
    // Delete belongs to the text field while editing
    room.handle(InputEvent::key("Delete")).unwrap();
    assert!(room.graph().contains_box(id));

    room.handle(InputEvent::key("Escape")).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.renderer().editing, None);
    assert_eq!(room.graph().get(id).unwrap().text, "hello");
    assert_eq!(room.history().len(), 3);
}

#[test]
fn slow_second_click_is_a_single_click() {
    let (mut room, clock, _) = with_box();

    click(&mut room, 100.0, 100.0);
    clock.advance(301);
    room.handle(primary(100.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::SelectingBox);
}

#[test]
fn double_click_on_different_boxes_is_two_clicks() {
    let (mut room, clock, _) = with_box();
    room.create_box(Point::new(400.0, 100.0)).unwrap();

    click(&mut room, 100.0, 100.0);
    clock.advance(50);
    room.handle(primary(400.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::SelectingBox);
}

#[test]
fn double_click_on_canvas_creates_and_edits_a_box() {
    let (mut room, clock) = setup();

    click(&mut room, 500.0, 400.0);
    clock.advance(100);
    room.handle(primary(500.0, 400.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::CreatingBox);
    assert_eq!(room.graph().len(), 1);

    let id = room.graph().topmost().unwrap();
    assert_eq!(room.graph().get(id).unwrap().center(), Point::new(500.0, 400.0));

    room.handle(InputEvent::up(500.0, 400.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::EditingBox);
    room.set_edit_text("new idea");
    assert!(room.finish_edit().unwrap());
    // base + create + edit
    assert_eq!(room.history().len(), 3);
}

#[test]
fn double_click_on_body_auto_fits() {
    let (mut room, clock, id) = with_box();

    click(&mut room, 30.0, 100.0);
    clock.advance(100);
    room.handle(primary(30.0, 100.0)).unwrap();
    // Empty text: one line of height 18 plus 12 padding per side
    assert_eq!(room.graph().get(id).unwrap().size, Size::new(24.0, 42.0));
}

// ─── Arrows ─────────────────────────────────────────────────────────────

#[test]
fn dragging_from_connector_creates_an_arrow() {
    let (mut room, _, a) = with_box();
    let b = room.create_box(Point::new(400.0, 100.0)).unwrap();

    room.handle(primary(22.0, 100.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::CreatingArrow);
    room.handle(InputEvent::moved(300.0, 110.0)).unwrap();
    assert_eq!(
        room.renderer().feedback,
        Some(Feedback::Connector {
            from: Point::new(100.0, 100.0),
            to: Point::new(300.0, 110.0),
        })
    );

    room.handle(InputEvent::up(400.0, 100.0)).unwrap();
    assert_eq!(room.renderer().feedback, None);
    let arrow = room.graph().find_arrow(a, b).unwrap();
    assert!(room.renderer().arrow_handle(arrow.id).is_some());
}

#[test]
fn releasing_on_the_source_creates_nothing() {
    let (mut room, _, a) = with_box();
    let depth = room.history().len();

    room.handle(primary(22.0, 100.0)).unwrap();
    room.handle(InputEvent::up(100.0, 100.0)).unwrap();

    assert_eq!(room.graph().arrow_count(), 0);
    assert!(room.graph().outgoing(a).is_empty());
    assert_eq!(room.history().len(), depth);
}

#[test]
fn escape_cancels_arrow_creation() {
    let (mut room, _, _) = with_box();
    room.create_box(Point::new(400.0, 100.0)).unwrap();

    room.handle(primary(22.0, 100.0)).unwrap();
    room.handle(InputEvent::moved(400.0, 100.0)).unwrap();
    room.handle(InputEvent::key("Escape")).unwrap();
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.renderer().feedback, None);

    room.handle(InputEvent::up(400.0, 100.0)).unwrap();
    assert_eq!(room.graph().arrow_count(), 0);
}

#[test]
fn clicking_an_arrow_selects_it_and_delete_removes_it() {
    let (mut room, _, a) = with_box();
    let b = room.create_box(Point::new(400.0, 100.0)).unwrap();
    let arrow = room.create_arrow(a, b).unwrap().unwrap();

    // Midway between the two boxes, on the straight connector
    click(&mut room, 250.0, 100.0);
    assert_eq!(room.state_kind(), StateKind::SelectingArrow);
    assert_eq!(room.selected_arrow(), Some(arrow));

    room.handle(InputEvent::key("Delete")).unwrap();
    assert_eq!(room.graph().arrow_count(), 0);
    assert_eq!(room.selected_arrow(), None);
    assert_eq!(room.state_kind(), StateKind::Idle);
}

// ─── Rubber band ────────────────────────────────────────────────────────

fn three_in_a_row() -> (TestRoom, [BoxId; 3]) {
    let (mut room, _) = setup();
    let b1 = room.create_box(Point::new(100.0, 100.0)).unwrap();
    let b2 = room.create_box(Point::new(300.0, 100.0)).unwrap();
    let b3 = room.create_box(Point::new(700.0, 100.0)).unwrap();
    (room, [b1, b2, b3])
}

#[test]
fn rubber_band_selects_intersecting_boxes() {
    let (mut room, [b1, b2, _]) = three_in_a_row();

    room.handle(primary(0.0, 0.0)).unwrap();
    assert_eq!(room.state_kind(), StateKind::RubberBandSelecting);
    room.handle(InputEvent::moved(450.0, 200.0)).unwrap();
    assert!(matches!(
        room.renderer().feedback,
        Some(Feedback::RubberBand(_))
    ));
    room.handle(InputEvent::up(450.0, 200.0)).unwrap();

    assert_eq!(room.selected_boxes(), &[b1, b2]);
    assert_eq!(room.renderer().selection, vec![b1, b2]);
    assert_eq!(room.renderer().feedback, None);
}

#[test]
fn modified_rubber_band_appends() {
    let (mut room, [b1, b2, b3]) = three_in_a_row();

    click(&mut room, 700.0, 100.0);
    assert_eq!(room.selected_boxes(), &[b3]);

    room.handle(InputEvent::PointerDown {
        x: 0.0,
        y: 0.0,
        button: PointerButton::Primary,
        modifiers: Modifiers::CTRL,
    })
    .unwrap();
    room.handle(InputEvent::moved(450.0, 200.0)).unwrap();
    room.handle(InputEvent::up(450.0, 200.0)).unwrap();

    assert_eq!(room.selected_boxes(), &[b3, b1, b2]);
}

#[test]
fn plain_click_on_canvas_clears_selection() {
    let (mut room, [b1, ..]) = three_in_a_row();
    room.select_box(b1, false);
    click(&mut room, 500.0, 500.0);
    assert!(room.selected_boxes().is_empty());
}

// ─── Context menus ──────────────────────────────────────────────────────

#[test]
fn box_menu_delete() {
    let (mut room, _, id) = with_box();

    room.handle(InputEvent::down(100.0, 100.0, PointerButton::Secondary))
        .unwrap();
    assert_eq!(room.state_kind(), StateKind::BoxMenu);
    assert_eq!(
        room.renderer().feedback,
        Some(Feedback::Menu {
            kind: MenuKind::Box(id),
            at: Point::new(100.0, 100.0),
        })
    );
    // Room entries don't apply to a box menu
    assert!(!room.menu_action(MenuAction::NewBox).unwrap());

    assert!(room.menu_action(MenuAction::Delete).unwrap());
    assert!(room.graph().is_empty());
    assert_eq!(room.state_kind(), StateKind::Idle);
    assert_eq!(room.renderer().feedback, None);
}

#[test]
fn box_menu_edit_enters_editing() {
    let (mut room, _, id) = with_box();

    room.handle(InputEvent::down(100.0, 100.0, PointerButton::Secondary))
        .unwrap();
    assert!(room.menu_action(MenuAction::Edit).unwrap());
    assert_eq!(room.state_kind(), StateKind::EditingBox);
    assert_eq!(room.renderer().editing, Some(id));
}

#[test]
fn room_menu_new_box_at_menu_position() {
    let (mut room, _) = setup();

    room.handle(InputEvent::down(600.0, 400.0, PointerButton::Secondary))
        .unwrap();
    assert_eq!(room.state_kind(), StateKind::RoomMenu);
    assert!(room.menu_action(MenuAction::NewBox).unwrap());

    let id = room.graph().topmost().unwrap();
    assert_eq!(room.graph().get(id).unwrap().center(), Point::new(600.0, 400.0));
}

#[test]
fn opening_a_menu_finishes_an_edit() {
    let (mut room, _, id) = with_box();

    room.begin_edit(id).unwrap();
    room.set_edit_text("draft");
    room.handle(InputEvent::down(500.0, 500.0, PointerButton::Secondary))
        .unwrap();

    assert_eq!(room.state_kind(), StateKind::RoomMenu);
    assert_eq!(room.renderer().editing, None);
    assert_eq!(room.history().undo_label(), Some("edit text"));
}

// ─── Keyboard ───────────────────────────────────────────────────────────

#[test]
fn delete_key_removes_selected_boxes_and_their_arrows() {
    let (mut room, _, a) = with_box();
    let b = room.create_box(Point::new(400.0, 100.0)).unwrap();
    room.create_arrow(a, b).unwrap();
    room.create_arrow(b, a).unwrap();

    click(&mut room, 100.0, 100.0);
    room.handle(InputEvent::key("Delete")).unwrap();

    assert!(!room.graph().contains_box(a));
    assert!(
        room.graph()
            .arrows()
            .iter()
            .all(|arrow| arrow.source != a && arrow.target != a)
    );
    assert_eq!(room.renderer().arrow_count(), 0);
}

#[test]
fn escape_from_idle_clears_selection() {
    let (mut room, _, id) = with_box();
    room.select_box(id, false);
    assert!(room.handle(InputEvent::key("Escape")).unwrap());
    assert!(room.selected_boxes().is_empty());
}

#[test]
fn scroll_zooms_around_the_pointer() {
    let (mut room, _) = setup();
    let anchor = Point::new(300.0, 200.0);
    let before = room.screen_to_graph(anchor);

    room.handle(InputEvent::Scroll {
        x: anchor.x,
        y: anchor.y,
        zoom: 2.0,
    })
    .unwrap();

    assert_eq!(room.viewport().1, 2.0);
    assert_eq!(room.screen_to_graph(anchor), before);
}
