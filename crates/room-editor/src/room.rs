//! The room: one canvas instance and everything that edits it.
//!
//! `Room` owns the graph, history, selection, clipboard, viewport, and
//! the current interaction state. Input enters through [`Room::handle`];
//! every state change goes through [`Room::transition`], which runs the
//! previous state's exit action before the next state's entry action.
//!
//! History policy: a snapshot is committed after each completed
//! operation. Gestures that mutate live (move, resize) record a pending
//! label and commit once, from their exit action.

use crate::clock::{Clock, SystemClock, Timer};
use crate::config::RoomConfig;
use crate::history::History;
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::notify::{Callback, Observers, RoomEvent, SubscriptionId};
use crate::selection::{ClipboardCapture, Selection};
use crate::shortcuts::{RoomAction, ShortcutMap};
use crate::state::{HoldIntent, InputClass, InteractionState, StateKind, TargetClass, next_state};
use kurbo::{Point, Rect, Size, Vec2};
use room_core::document::{self, GraphDocument};
use room_core::error::Result;
use room_core::geometry::route_arrow;
use room_core::id::{ArrowId, BoxId};
use room_core::model::{BoxNode, ContentType, Graph};
use room_core::tags::{SharedTags, Tag, TagDictionary, tag_has_color};
use room_render::adapter::{Cursor, Feedback, MenuKind, RenderAdapter};
use room_render::hit::{self, BoxZone, HitZones, Target};

/// Zoom step for keyboard zoom.
const ZOOM_STEP: f64 = 1.25;

/// An entity that can carry a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTarget {
    Box(BoxId),
    Arrow(ArrowId),
}

/// Entries of the box, arrow, and room context menus.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    Edit,
    AutoFit,
    Delete,
    SetTag(Option<String>),
    SetContentType(ContentType),
    LinkNote(String),
    Copy,
    Cut,
    NewBox,
    Paste,
    SelectAll,
}

impl MenuAction {
    fn applies_to(&self, menu: StateKind) -> bool {
        use MenuAction::*;
        match menu {
            StateKind::BoxMenu => matches!(
                self,
                Edit | AutoFit | Delete | SetTag(_) | SetContentType(_) | LinkNote(_) | Copy | Cut
            ),
            StateKind::ArrowMenu => matches!(self, Delete | SetTag(_)),
            StateKind::RoomMenu => matches!(self, NewBox | Paste | SelectAll),
            _ => false,
        }
    }
}

/// Last primary press, for double-click detection.
#[derive(Debug, Clone, Copy)]
struct PressRecord {
    at_ms: u64,
    target: Target,
}

/// Pointer bookkeeping for the gesture in progress.
#[derive(Debug, Clone, Copy, Default)]
struct Gesture {
    press_screen: Point,
    press_graph: Point,
    last_screen: Point,
    last_graph: Point,
    start_size: Size,
    /// Ctrl/⌘/Shift held at press: extend the selection.
    append: bool,
}

impl Gesture {
    fn new(screen: Point, graph: Point, append: bool) -> Self {
        Self {
            press_screen: screen,
            press_graph: graph,
            last_screen: screen,
            last_graph: graph,
            start_size: Size::ZERO,
            append,
        }
    }
}

#[derive(Debug, Clone)]
struct EditSession {
    id: BoxId,
    original: String,
}

/// Same box, same arrow, or both empty canvas. Zones are ignored.
fn same_entity(a: &Target, b: &Target) -> bool {
    match (a, b) {
        (Target::Box { id: x, .. }, Target::Box { id: y, .. }) => x == y,
        (Target::Arrow(x), Target::Arrow(y)) => x == y,
        (Target::Canvas, Target::Canvas) => true,
        _ => false,
    }
}

pub struct Room<R: RenderAdapter, C: Clock = SystemClock> {
    graph: Graph,
    history: History,
    selection: Selection,
    clipboard: Option<ClipboardCapture>,
    tags: SharedTags,
    /// Dictionary removals already applied to this graph.
    tags_seen: usize,
    config: RoomConfig,
    zones: HitZones,
    renderer: R,
    clock: C,
    state: InteractionState,
    gesture: Gesture,
    hold: Timer<HoldIntent>,
    last_press: Option<PressRecord>,
    edit: Option<EditSession>,
    /// Label of a live mutation not yet committed.
    pending: Option<&'static str>,
    /// Last known pointer position, graph coordinates.
    pointer: Point,
    offset: Vec2,
    zoom: f64,
    dirty: bool,
    observers: Observers,
}

impl<R: RenderAdapter> Room<R, SystemClock> {
    /// An empty room with default configuration and its own tag
    /// dictionary.
    pub fn new(renderer: R) -> Result<Self> {
        Self::with_config(
            renderer,
            SystemClock::default(),
            RoomConfig::default(),
            TagDictionary::default().shared(),
        )
    }
}

impl<R: RenderAdapter, C: Clock> Room<R, C> {
    pub fn with_clock(renderer: R, clock: C) -> Result<Self> {
        Self::with_config(
            renderer,
            clock,
            RoomConfig::default(),
            TagDictionary::default().shared(),
        )
    }

    /// Build a room. `tags` may be shared with other rooms of the process.
    pub fn with_config(renderer: R, clock: C, config: RoomConfig, tags: SharedTags) -> Result<Self> {
        let graph = Graph::new();
        let history = History::new(&document::serialize_state(&graph), config.history_capacity)?;
        let zones = config.hit_zones();
        let tags_seen = tags.borrow().generation();
        Ok(Self {
            graph,
            history,
            selection: Selection::new(),
            clipboard: None,
            tags,
            tags_seen,
            config,
            zones,
            renderer,
            clock,
            state: InteractionState::Idle,
            gesture: Gesture::default(),
            hold: Timer::default(),
            last_press: None,
            edit: None,
            pending: None,
            pointer: Point::ZERO,
            offset: Vec2::ZERO,
            zoom: 1.0,
            dirty: false,
            observers: Observers::default(),
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_boxes(&self) -> &[BoxId] {
        self.selection.boxes()
    }

    pub fn selected_arrow(&self) -> Option<ArrowId> {
        self.selection.arrow()
    }

    pub fn clipboard(&self) -> Option<&ClipboardCapture> {
        self.clipboard.as_ref()
    }

    pub fn tags(&self) -> SharedTags {
        self.tags.clone()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Direct access for hosts restoring persisted history.
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Pan offset (screen units) and zoom factor.
    pub fn viewport(&self) -> (Vec2, f64) {
        (self.offset, self.zoom)
    }

    pub fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Process one input event. Due scheduled tasks fire first.
    /// Returns `true` if anything visible changed.
    pub fn handle(&mut self, event: InputEvent) -> Result<bool> {
        let fired = self.poll_timers()?;
        let synced = self.sync_tags()?;
        let changed = match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(x, y), button, modifiers)?,
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(Point::new(x, y))?,
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(Point::new(x, y))?,
            InputEvent::PointerLeave => self.pointer_leave()?,
            InputEvent::Scroll { x, y, zoom } => self.zoom_at(Point::new(x, y), zoom),
            InputEvent::Key { key, modifiers } => self.key(&key, modifiers)?,
        };
        Ok(fired || synced || changed)
    }

    /// Fire scheduled tasks whose deadline has passed and apply tag
    /// removals made through the shared dictionary.
    pub fn tick(&mut self) -> Result<bool> {
        let fired = self.poll_timers()?;
        let synced = self.sync_tags()?;
        Ok(fired || synced)
    }

    fn poll_timers(&mut self) -> Result<bool> {
        let now = self.clock.now_ms();
        let Some(intent) = self.hold.poll(now) else {
            return Ok(false);
        };
        let Some(kind) = next_state(self.state.kind(), InputClass::HoldElapsed(intent)) else {
            return Ok(false);
        };
        let next = match (kind, self.state) {
            (StateKind::MovingBoxes, _) => InteractionState::MovingBoxes,
            (StateKind::ResizingBox, InteractionState::SelectingBox { id }) => {
                InteractionState::ResizingBox { id }
            }
            (StateKind::Panning, _) => InteractionState::Panning,
            _ => return Ok(false),
        };
        log::debug!("hold threshold elapsed: {intent:?}");
        self.transition(next)?;
        Ok(true)
    }

    fn schedule_hold(&mut self, intent: HoldIntent) {
        let now = self.clock.now_ms();
        self.hold
            .schedule(now, self.config.hold_threshold_ms, intent);
    }

    fn pointer_down(&mut self, screen: Point, button: PointerButton, mods: Modifiers) -> Result<bool> {
        let p = self.screen_to_graph(screen);
        self.pointer = p;
        let target = self.renderer.hit_test(&self.graph, p, &self.zones);
        let class = TargetClass::from(&target);
        let now = self.clock.now_ms();

        let double = button == PointerButton::Primary
            && self.last_press.is_some_and(|prev| {
                same_entity(&prev.target, &target)
                    && now.saturating_sub(prev.at_ms) <= self.config.double_click_ms
            });
        let input = if double {
            InputClass::DoubleClick(class)
        } else {
            InputClass::Press(button, class)
        };
        let Some(kind) = next_state(self.state.kind(), input) else {
            return Ok(false);
        };
        if button == PointerButton::Primary {
            // A qualifying pair is consumed; a third press starts over
            self.last_press = (!double).then_some(PressRecord { at_ms: now, target });
        }

        self.gesture = Gesture::new(screen, p, mods.command() || mods.shift);
        if double {
            self.double_click(kind, target, p)
        } else {
            self.press(kind, button, target, p)
        }
    }

    fn press(&mut self, kind: StateKind, button: PointerButton, target: Target, p: Point) -> Result<bool> {
        match (kind, target) {
            (StateKind::SelectingBox, Target::Box { id, zone }) => {
                self.transition(InteractionState::SelectingBox { id })?;
                self.press_box(id);
                let intent = if button == PointerButton::Primary && zone == BoxZone::Resize {
                    HoldIntent::Resize
                } else {
                    HoldIntent::Move
                };
                self.schedule_hold(intent);
            }
            (StateKind::CreatingArrow, Target::Box { id, .. }) => {
                self.transition(InteractionState::CreatingArrow { source: id })?;
            }
            (StateKind::SelectingArrow, Target::Arrow(id)) => {
                self.transition(InteractionState::SelectingArrow { id })?;
                self.select_arrow(id);
            }
            (StateKind::RubberBandSelecting, _) => {
                self.transition(InteractionState::RubberBandSelecting)?;
                if !self.gesture.append {
                    self.clear_selection();
                }
            }
            (StateKind::Idle, _) => {
                self.transition(InteractionState::Idle)?;
                self.schedule_hold(HoldIntent::Pan);
            }
            (StateKind::BoxMenu, Target::Box { id, .. }) => {
                self.transition(InteractionState::BoxMenu { id, at: p })?;
            }
            (StateKind::ArrowMenu, Target::Arrow(id)) => {
                self.transition(InteractionState::ArrowMenu { id, at: p })?;
            }
            (StateKind::RoomMenu, _) => {
                self.transition(InteractionState::RoomMenu { at: p })?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn double_click(&mut self, kind: StateKind, target: Target, p: Point) -> Result<bool> {
        match (kind, target) {
            (StateKind::EditingBox, Target::Box { id, .. }) => {
                self.select_box(id, false);
                self.transition(InteractionState::EditingBox { id })?;
            }
            (StateKind::SelectingBox, Target::Box { id, .. }) => {
                self.transition(InteractionState::SelectingBox { id })?;
                self.select_box(id, false);
                self.auto_fit(id)?;
            }
            (StateKind::CreatingArrow, Target::Box { id, .. }) => {
                self.transition(InteractionState::CreatingArrow { source: id })?;
            }
            (StateKind::SelectingArrow, Target::Arrow(id)) => {
                self.transition(InteractionState::SelectingArrow { id })?;
                self.select_arrow(id);
            }
            (StateKind::CreatingBox, Target::Canvas) => {
                let id = self.create_box(p)?;
                self.transition(InteractionState::CreatingBox { id })?;
                self.select_box(id, false);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn pointer_move(&mut self, screen: Point) -> Result<bool> {
        let p = self.screen_to_graph(screen);
        self.pointer = p;
        let wandered = (screen - self.gesture.press_screen).hypot() > self.config.hold_slop;
        if self.hold.is_pending() && wandered {
            self.hold.cancel();
            log::trace!("pointer moved before hold threshold; drag suppressed");
        }

        match self.state {
            InteractionState::CreatingArrow { source } => {
                let Some(from) = self.graph.get(source).map(BoxNode::center) else {
                    return Ok(false);
                };
                self.renderer
                    .set_feedback(Some(Feedback::Connector { from, to: p }));
            }
            InteractionState::RubberBandSelecting => {
                let rect = Rect::from_points(self.gesture.press_graph, p);
                self.renderer.set_feedback(Some(Feedback::RubberBand(rect)));
            }
            InteractionState::MovingBoxes => {
                let delta = p - self.gesture.last_graph;
                self.gesture.last_graph = p;
                return Ok(self.move_selection(delta));
            }
            InteractionState::ResizingBox { id } => {
                let d = p - self.gesture.press_graph;
                let start = self.gesture.start_size;
                let size = Size::new(start.width + d.x, start.height + d.y);
                let changed = self.set_size(id, size);
                if changed {
                    self.pending = Some("resize box");
                }
                return Ok(changed);
            }
            InteractionState::Panning => {
                let delta = screen - self.gesture.last_screen;
                self.gesture.last_screen = screen;
                return Ok(self.pan(delta));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn pointer_up(&mut self, screen: Point) -> Result<bool> {
        let p = self.screen_to_graph(screen);
        self.pointer = p;
        let hold_pending = self.hold.cancel();

        match self.state {
            InteractionState::CreatingArrow { source } => {
                let target = self.renderer.hit_test(&self.graph, p, &self.zones);
                if let Some(id) = target.box_id() {
                    self.create_arrow(source, id)?;
                }
            }
            InteractionState::RubberBandSelecting => {
                let rect = Rect::from_points(self.gesture.press_graph, p);
                self.select_in_rect(rect);
            }
            _ => {}
        }

        let Some(kind) = next_state(self.state.kind(), InputClass::Release) else {
            return Ok(hold_pending);
        };
        let next = match (kind, self.state) {
            (StateKind::EditingBox, InteractionState::CreatingBox { id }) => {
                InteractionState::EditingBox { id }
            }
            _ => InteractionState::Idle,
        };
        self.transition(next)?;
        Ok(true)
    }

    fn pointer_leave(&mut self) -> Result<bool> {
        self.hold.cancel();
        self.last_press = None;
        match next_state(self.state.kind(), InputClass::Leave) {
            Some(_) => {
                self.transition(InteractionState::Idle)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn key(&mut self, key: &str, mods: Modifiers) -> Result<bool> {
        let Some(action) = ShortcutMap::resolve(key, mods) else {
            return Ok(false);
        };
        // Keystrokes belong to the text being edited
        if matches!(self.state, InteractionState::EditingBox { .. }) && action != RoomAction::Cancel {
            return Ok(false);
        }
        self.perform(action)
    }

    /// Run a keyboard-level action. Ignored while the pointer is held,
    /// except `Cancel`. An open menu is closed first.
    pub fn perform(&mut self, action: RoomAction) -> Result<bool> {
        if action == RoomAction::Cancel {
            return self.cancel();
        }
        if self.state.kind().holds_pointer() {
            return Ok(false);
        }
        if self.state.kind().is_menu() {
            self.transition(InteractionState::Idle)?;
        }
        match action {
            RoomAction::Undo => self.undo(),
            RoomAction::Redo => self.redo(),
            RoomAction::Delete => self.delete_selection(),
            RoomAction::SelectAll => Ok(self.select_all()),
            RoomAction::Duplicate => Ok(!self.duplicate_selection()?.is_empty()),
            RoomAction::Copy => Ok(self.copy()),
            RoomAction::Cut => self.cut(),
            RoomAction::Paste => Ok(!self.paste()?.is_empty()),
            RoomAction::ZoomIn => Ok(self.zoom_at(self.graph_to_screen(self.pointer), ZOOM_STEP)),
            RoomAction::ZoomOut => Ok(self.zoom_at(self.graph_to_screen(self.pointer), 1.0 / ZOOM_STEP)),
            RoomAction::ResetZoom => Ok(self.reset_view()),
            RoomAction::Cancel => self.cancel(),
        }
    }

    /// Escape: abort whatever is in progress. From idle, clears the
    /// selection.
    pub fn cancel(&mut self) -> Result<bool> {
        self.hold.cancel();
        if next_state(self.state.kind(), InputClass::Cancel).is_some() {
            self.transition(InteractionState::Idle)?;
            return Ok(true);
        }
        if self.selection.is_empty() {
            return Ok(false);
        }
        self.clear_selection();
        Ok(true)
    }

    // ─── Transitions ─────────────────────────────────────────────────────

    /// Leave the current state and enter `next`.
    pub fn transition(&mut self, next: InteractionState) -> Result<()> {
        let prev = self.state;
        self.exit(prev)?;
        self.state = next;
        self.enter(next)?;
        log::debug!("state {:?} -> {:?}", prev.kind(), next.kind());
        if prev.kind() != next.kind() {
            self.observers.emit(&RoomEvent::StateChanged(next.kind()));
        }
        Ok(())
    }

    fn exit(&mut self, prev: InteractionState) -> Result<()> {
        match prev {
            InteractionState::Idle | InteractionState::SelectingBox { .. } => {
                self.hold.cancel();
            }
            InteractionState::CreatingArrow { .. }
            | InteractionState::RubberBandSelecting
            | InteractionState::BoxMenu { .. }
            | InteractionState::ArrowMenu { .. }
            | InteractionState::RoomMenu { .. } => {
                self.renderer.set_feedback(None);
            }
            InteractionState::ResizingBox { .. } | InteractionState::MovingBoxes => {
                self.commit_pending()?;
            }
            InteractionState::EditingBox { .. } => self.end_edit_session()?,
            InteractionState::Panning
            | InteractionState::SelectingArrow { .. }
            | InteractionState::CreatingBox { .. } => {}
        }
        self.renderer.set_cursor(Cursor::Default);
        Ok(())
    }

    fn enter(&mut self, next: InteractionState) -> Result<()> {
        let kind = next.kind();
        if kind.is_drag() || kind.is_menu() {
            self.end_edit_session()?;
        }
        match next {
            InteractionState::CreatingArrow { source } => {
                if let Some(from) = self.graph.get(source).map(BoxNode::center) {
                    self.renderer.set_feedback(Some(Feedback::Connector {
                        from,
                        to: self.pointer,
                    }));
                }
            }
            InteractionState::RubberBandSelecting => {
                let at = self.gesture.press_graph;
                self.renderer
                    .set_feedback(Some(Feedback::RubberBand(Rect::from_points(at, at))));
            }
            InteractionState::ResizingBox { id } => {
                if let Some(node) = self.graph.get(id) {
                    self.gesture.start_size = node.size;
                }
            }
            InteractionState::MovingBoxes => {
                self.gesture.last_graph = self.pointer;
            }
            InteractionState::Panning => {
                self.gesture.last_screen = self.graph_to_screen(self.pointer);
            }
            InteractionState::EditingBox { id } => {
                if let Some(node) = self.graph.get(id) {
                    self.edit = Some(EditSession {
                        id,
                        original: node.text.clone(),
                    });
                    self.renderer.set_editing(Some(id));
                }
            }
            InteractionState::BoxMenu { id, at } => self.show_menu(MenuKind::Box(id), at),
            InteractionState::ArrowMenu { id, at } => self.show_menu(MenuKind::Arrow(id), at),
            InteractionState::RoomMenu { at } => self.show_menu(MenuKind::Room, at),
            InteractionState::Idle
            | InteractionState::SelectingBox { .. }
            | InteractionState::SelectingArrow { .. }
            | InteractionState::CreatingBox { .. } => {}
        }
        self.renderer.set_cursor(kind.cursor());
        Ok(())
    }

    fn show_menu(&mut self, kind: MenuKind, at: Point) {
        let at = self.graph_to_screen(at);
        self.renderer.set_feedback(Some(Feedback::Menu { kind, at }));
    }

    /// Return to idle, committing anything in flight.
    fn settle(&mut self) -> Result<()> {
        self.hold.cancel();
        if !matches!(self.state, InteractionState::Idle) {
            self.transition(InteractionState::Idle)?;
        }
        self.commit_pending()?;
        Ok(())
    }

    /// Fall back to idle if the current state refers to a vanished entity.
    fn drop_stale_state(&mut self) -> Result<()> {
        let stale = match self.state {
            InteractionState::SelectingBox { id }
            | InteractionState::CreatingArrow { source: id }
            | InteractionState::ResizingBox { id }
            | InteractionState::EditingBox { id }
            | InteractionState::CreatingBox { id }
            | InteractionState::BoxMenu { id, .. } => !self.graph.contains_box(id),
            InteractionState::SelectingArrow { id } | InteractionState::ArrowMenu { id, .. } => {
                self.graph.arrow(id).is_none()
            }
            InteractionState::Idle
            | InteractionState::RubberBandSelecting
            | InteractionState::MovingBoxes
            | InteractionState::Panning
            | InteractionState::RoomMenu { .. } => false,
        };
        if stale {
            self.transition(InteractionState::Idle)?;
        }
        Ok(())
    }

    // ─── History ─────────────────────────────────────────────────────────

    fn commit(&mut self, label: &str) -> Result<()> {
        let doc = document::serialize_state(&self.graph);
        self.history.commit(&doc, label)?;
        self.set_dirty(true);
        self.emit_history();
        Ok(())
    }

    /// Commit a live mutation (move, resize) performed outside a gesture.
    /// Returns `true` if there was one.
    pub fn commit_pending(&mut self) -> Result<bool> {
        match self.pending.take() {
            Some(label) => {
                self.commit(label)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restore the previous snapshot. `Ok(false)` at the bottom of the
    /// stack. A snapshot that fails to decode is an error and leaves the
    /// graph untouched.
    pub fn undo(&mut self) -> Result<bool> {
        self.settle()?;
        let Some(doc) = self.history.peek_undo()? else {
            return Ok(false);
        };
        self.history.step_back();
        log::debug!("undo -> {}", self.history.pointer());
        self.restore(&doc)?;
        Ok(true)
    }

    /// Restore the next snapshot. `Ok(false)` at the top of the stack.
    pub fn redo(&mut self) -> Result<bool> {
        self.settle()?;
        let Some(doc) = self.history.peek_redo()? else {
            return Ok(false);
        };
        self.history.step_forward();
        log::debug!("redo -> {}", self.history.pointer());
        self.restore(&doc)?;
        Ok(true)
    }

    fn restore(&mut self, doc: &GraphDocument) -> Result<()> {
        self.graph = document::deserialize_state(doc);
        // Arrow IDs are reassigned on every restore
        self.selection.set_arrow(None);
        self.selection.prune(&self.graph);
        self.drop_stale_state()?;
        self.redraw_all();
        self.set_dirty(true);
        self.emit_history();
        Ok(())
    }

    fn emit_history(&mut self) {
        self.observers.emit(&RoomEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.observers.emit(&RoomEvent::DirtyChanged(dirty));
        }
    }

    pub fn mark_saved(&mut self) {
        self.set_dirty(false);
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn serialize_state(&self) -> GraphDocument {
        document::serialize_state(&self.graph)
    }

    pub fn to_json(&self) -> Result<String> {
        self.serialize_state().to_json()
    }

    /// Replace the graph with `doc`. History restarts with the loaded
    /// graph as its base; the room is clean afterwards.
    pub fn load_document(&mut self, doc: &GraphDocument) -> Result<()> {
        self.settle()?;
        let graph = document::deserialize_state(doc);
        self.history.reset(&document::serialize_state(&graph))?;
        self.graph = graph;
        self.selection.clear();
        self.last_press = None;
        self.redraw_all();
        self.set_dirty(false);
        self.emit_history();
        log::debug!(
            "loaded {} boxes, {} arrows",
            self.graph.len(),
            self.graph.arrow_count()
        );
        Ok(())
    }

    pub fn load_json(&mut self, text: &str) -> Result<()> {
        let doc = GraphDocument::from_json(text)?;
        self.load_document(&doc)
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    fn draw_box(&mut self, id: BoxId, fresh: bool) {
        if let Some(node) = self.graph.get(id) {
            self.renderer.draw_box(node, fresh);
        }
    }

    fn draw_arrow(&mut self, id: ArrowId) {
        if let Some(arrow) = self.graph.arrow(id)
            && let Some(path) = route_arrow(&self.graph, arrow)
        {
            self.renderer.draw_arrow(arrow, &path);
        }
    }

    /// Reroute every connector touching `id`.
    fn draw_arrows_of(&mut self, id: BoxId) {
        for arrow in self.graph.incident_arrows(id) {
            self.draw_arrow(arrow);
        }
    }

    fn refresh_all(&mut self) {
        for node in self.graph.boxes() {
            self.renderer.draw_box(node, false);
        }
        for arrow in self.graph.arrows() {
            if let Some(path) = route_arrow(&self.graph, arrow) {
                self.renderer.draw_arrow(arrow, &path);
            }
        }
    }

    /// Drop every visual and recreate the whole graph.
    fn redraw_all(&mut self) {
        self.renderer.clear();
        for node in self.graph.boxes() {
            self.renderer.draw_box(node, true);
        }
        for arrow in self.graph.arrows() {
            if let Some(path) = route_arrow(&self.graph, arrow) {
                self.renderer.draw_arrow(arrow, &path);
            }
        }
        self.selection_changed();
    }

    // ─── Selection ───────────────────────────────────────────────────────

    fn selection_changed(&mut self) {
        self.renderer
            .set_selection(self.selection.boxes(), self.selection.arrow());
        self.observers.emit(&RoomEvent::SelectionChanged {
            boxes: self.selection.boxes().to_vec(),
            arrow: self.selection.arrow(),
        });
    }

    fn raise(&mut self, id: BoxId) {
        if self.graph.raise(id) {
            self.draw_box(id, false);
        }
    }

    /// Raise `id` to the top and select it. Without `append` the previous
    /// selection is replaced.
    pub fn select_box(&mut self, id: BoxId, append: bool) -> bool {
        if !self.graph.contains_box(id) {
            return false;
        }
        self.raise(id);
        if !append {
            self.selection.clear();
        }
        self.selection.add(id);
        self.selection_changed();
        true
    }

    /// Press on a box: keep a multi-selection that already contains it so
    /// the whole set can be dragged.
    fn press_box(&mut self, id: BoxId) {
        if self.gesture.append || !self.selection.contains(id) {
            self.select_box(id, self.gesture.append);
        } else {
            self.raise(id);
        }
    }

    pub fn select_arrow(&mut self, id: ArrowId) -> bool {
        if self.graph.arrow(id).is_none() {
            return false;
        }
        self.selection.clear();
        self.selection.set_arrow(Some(id));
        self.selection_changed();
        true
    }

    /// Add every box intersecting `rect` (graph coordinates).
    pub fn select_in_rect(&mut self, rect: Rect) -> bool {
        let mut added = false;
        for id in hit::hit_test_rect(&self.graph, rect) {
            added |= self.selection.add(id);
        }
        if added {
            self.selection.set_arrow(None);
            self.selection_changed();
        }
        added
    }

    pub fn select_all(&mut self) -> bool {
        if self.graph.is_empty() {
            return false;
        }
        self.selection.replace(self.graph.box_ids());
        self.selection_changed();
        true
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.selection_changed();
        }
    }

    // ─── Boxes ───────────────────────────────────────────────────────────

    /// Create a default-sized box centered at `at` (graph coordinates),
    /// on top of the z-order.
    pub fn create_box(&mut self, at: Point) -> Result<BoxId> {
        self.commit_pending()?;
        let size = Size::new(self.config.default_box_width, self.config.default_box_height);
        let id = self.graph.fresh_box_id();
        let mut node = BoxNode::new(id, at - size.to_vec2() / 2.0, size);
        node.default_size = size;
        self.graph.insert_box(node);
        self.draw_box(id, true);
        log::debug!("created {id} at ({:.1}, {:.1})", at.x, at.y);
        self.commit("create box")?;
        Ok(id)
    }

    /// Take a box and its connectors out of the graph and the renderer.
    fn take_box(&mut self, id: BoxId) -> bool {
        let Some(removed) = self.graph.remove_box(id) else {
            return false;
        };
        for arrow in &removed.arrows {
            self.renderer.remove_arrow(arrow.id);
        }
        self.renderer.remove_box(id);
        true
    }

    fn after_removal(&mut self) -> Result<()> {
        if self.selection.prune(&self.graph) {
            self.selection_changed();
        }
        self.drop_stale_state()
    }

    /// Delete a box with every arrow it sources or targets.
    pub fn remove_box(&mut self, id: BoxId) -> Result<bool> {
        self.commit_pending()?;
        if !self.take_box(id) {
            return Ok(false);
        }
        self.after_removal()?;
        self.commit("delete box")?;
        Ok(true)
    }

    /// Delete every selected box, or the selected arrow when no box is
    /// selected. One snapshot for the batch.
    pub fn delete_selection(&mut self) -> Result<bool> {
        self.commit_pending()?;
        let ids = self.selection.boxes().to_vec();
        if ids.is_empty() {
            return match self.selection.arrow() {
                Some(arrow) => self.remove_arrow(arrow),
                None => Ok(false),
            };
        }
        let mut removed = 0usize;
        for id in ids {
            if self.take_box(id) {
                removed += 1;
            }
        }
        self.after_removal()?;
        if removed == 0 {
            return Ok(false);
        }
        log::debug!("deleted {removed} boxes");
        self.commit("delete")?;
        Ok(true)
    }

    fn clamp(&self, size: Size) -> Size {
        Size::new(
            size.width.max(self.config.min_box_width),
            size.height.max(self.config.min_box_height),
        )
    }

    /// Set a box's size (clamped) and redraw it. No history.
    fn set_size(&mut self, id: BoxId, size: Size) -> bool {
        let size = self.clamp(size);
        let Some(node) = self.graph.get_mut(id) else {
            return false;
        };
        if node.size == size {
            return false;
        }
        node.size = size;
        self.draw_box(id, false);
        self.draw_arrows_of(id);
        true
    }

    /// Grow or shrink a box live. Committed by the end of the gesture or
    /// by [`Room::commit_pending`].
    pub fn resize_box(&mut self, id: BoxId, dw: f64, dh: f64) -> bool {
        let Some(node) = self.graph.get(id) else {
            return false;
        };
        let size = Size::new(node.size.width + dw, node.size.height + dh);
        let changed = self.set_size(id, size);
        if changed {
            self.pending = Some("resize box");
        }
        changed
    }

    /// Translate every selected box live.
    pub fn move_selection(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO || self.selection.boxes().is_empty() {
            return false;
        }
        let ids = self.selection.boxes().to_vec();
        for id in &ids {
            if let Some(node) = self.graph.get_mut(*id) {
                node.position += delta;
            }
        }
        for id in ids {
            self.draw_box(id, false);
            self.draw_arrows_of(id);
        }
        self.pending = Some("move boxes");
        true
    }

    /// Fit a box to its content: text reflowed at the default width, plus
    /// padding on every side.
    pub fn auto_fit(&mut self, id: BoxId) -> Result<bool> {
        self.commit_pending()?;
        let Some(node) = self.graph.get(id) else {
            return Ok(false);
        };
        let pad = self.config.autofit_padding;
        let max_width = (node.default_size.width - 2.0 * pad).max(1.0);
        let natural = self.renderer.measure_content(node, max_width);
        let size = Size::new(natural.width + 2.0 * pad, natural.height + 2.0 * pad);
        if !self.set_size(id, size) {
            return Ok(false);
        }
        self.commit("auto-fit")?;
        Ok(true)
    }

    /// Switch the content interpretation. `Book` needs a linked note
    /// (see [`Room::link_note`]).
    pub fn set_content_type(&mut self, id: BoxId, content: ContentType) -> Result<bool> {
        self.commit_pending()?;
        let Some(node) = self.graph.get_mut(id) else {
            return Ok(false);
        };
        if node.content == content {
            return Ok(false);
        }
        if content == ContentType::Book && node.linked_note_path.is_none() {
            log::debug!("{id}: book content needs a linked note");
            return Ok(false);
        }
        node.content = content;
        if content != ContentType::Book {
            node.linked_note_path = None;
        }
        // Fresh draw discards the markup cache
        self.draw_box(id, true);
        self.commit("set content type")?;
        Ok(true)
    }

    /// Turn a box into a reference to the note at `path`.
    pub fn link_note(&mut self, id: BoxId, path: &str) -> Result<bool> {
        self.commit_pending()?;
        let Some(node) = self.graph.get_mut(id) else {
            return Ok(false);
        };
        if node.content == ContentType::Book && node.linked_note_path.as_deref() == Some(path) {
            return Ok(false);
        }
        node.content = ContentType::Book;
        node.linked_note_path = Some(path.to_string());
        self.draw_box(id, true);
        self.commit("link note")?;
        Ok(true)
    }

    // ─── Text editing ────────────────────────────────────────────────────

    pub fn begin_edit(&mut self, id: BoxId) -> Result<bool> {
        if !self.graph.contains_box(id) {
            return Ok(false);
        }
        self.transition(InteractionState::EditingBox { id })?;
        Ok(true)
    }

    /// Replace the text of the box being edited. Committed when editing
    /// ends.
    pub fn set_edit_text(&mut self, text: &str) -> bool {
        let InteractionState::EditingBox { id } = self.state else {
            return false;
        };
        let Some(node) = self.graph.get_mut(id) else {
            return false;
        };
        if node.text == text {
            return false;
        }
        node.text = text.to_string();
        // Markup has to be re-rendered from the new source
        let fresh = node.content.is_markup();
        self.draw_box(id, fresh);
        true
    }

    pub fn finish_edit(&mut self) -> Result<bool> {
        if !matches!(self.state, InteractionState::EditingBox { .. }) {
            return Ok(false);
        }
        self.transition(InteractionState::Idle)?;
        Ok(true)
    }

    fn end_edit_session(&mut self) -> Result<()> {
        let Some(session) = self.edit.take() else {
            return Ok(());
        };
        self.renderer.set_editing(None);
        let changed = self
            .graph
            .get(session.id)
            .is_some_and(|n| n.text != session.original);
        if changed {
            self.draw_box(session.id, true);
            self.commit("edit text")?;
        }
        Ok(())
    }

    // ─── Tags ────────────────────────────────────────────────────────────

    /// Apply `color` to an entity, or clear its tag with `None`.
    pub fn set_tag(&mut self, target: TagTarget, color: Option<&str>) -> Result<bool> {
        self.commit_pending()?;
        let current = match target {
            TagTarget::Box(id) => self.graph.get(id).map(|n| n.tag.clone()),
            TagTarget::Arrow(id) => self.graph.arrow(id).map(|a| a.tag.clone()),
        };
        let Some(current) = current else {
            return Ok(false);
        };
        let next = color.map(|c| self.tags.borrow().tag_for(c, current.as_ref()));
        if next == current {
            return Ok(false);
        }
        self.store_tag(target, next);
        self.commit("set tag")?;
        Ok(true)
    }

    /// Give an entity's current tag a custom name.
    pub fn rename_tag(&mut self, target: TagTarget, name: &str) -> Result<bool> {
        self.commit_pending()?;
        let current = match target {
            TagTarget::Box(id) => self.graph.get(id).and_then(|n| n.tag.clone()),
            TagTarget::Arrow(id) => self.graph.arrow(id).and_then(|a| a.tag.clone()),
        };
        let Some(mut tag) = current else {
            return Ok(false);
        };
        if tag.name == name {
            return Ok(false);
        }
        tag.name = name.to_string();
        self.store_tag(target, Some(tag));
        self.commit("rename tag")?;
        Ok(true)
    }

    fn store_tag(&mut self, target: TagTarget, tag: Option<Tag>) {
        match target {
            TagTarget::Box(id) => {
                if let Some(node) = self.graph.get_mut(id) {
                    node.tag = tag;
                }
                self.draw_box(id, false);
            }
            TagTarget::Arrow(id) => {
                if let Some(arrow) = self.graph.arrow_mut(id) {
                    arrow.tag = tag;
                }
                self.draw_arrow(id);
            }
        }
    }

    /// Remove `color` from the tag dictionary and clear it from every box
    /// and arrow. Other rooms sharing the dictionary clear theirs on their
    /// next input event or `tick`.
    pub fn remove_tag_color(&mut self, color: &str) -> Result<bool> {
        self.commit_pending()?;
        let removed = self.tags.borrow_mut().remove(color);
        let cleared = self.sync_tags()?;
        Ok(removed || cleared)
    }

    /// Clear tags whose color was removed from the dictionary since the
    /// last sync. One snapshot if anything was cleared.
    pub fn sync_tags(&mut self) -> Result<bool> {
        let removed = {
            let tags = self.tags.borrow();
            let removed = tags.removed_since(self.tags_seen).to_vec();
            self.tags_seen = tags.generation();
            removed
        };
        if removed.is_empty() {
            return Ok(false);
        }
        let cleared = self
            .graph
            .clear_tags_where(|t| removed.iter().any(|c| tag_has_color(t, c)));
        if cleared == 0 {
            return Ok(false);
        }
        self.refresh_all();
        log::debug!("removed tag colors {removed:?} cleared from {cleared} entities");
        self.commit("remove tag")?;
        Ok(true)
    }

    /// Define or rename a dictionary entry. Entities already tagged keep
    /// their names.
    pub fn set_tag_name(&mut self, color: &str, name: &str) {
        self.tags.borrow_mut().set(color, name);
    }

    // ─── Arrows ──────────────────────────────────────────────────────────

    /// Connect `source` to `target`. Self-loops, duplicates, and unknown
    /// endpoints are rejected with `Ok(None)`.
    pub fn create_arrow(&mut self, source: BoxId, target: BoxId) -> Result<Option<ArrowId>> {
        self.commit_pending()?;
        match self.graph.add_arrow(source, target, None) {
            Ok(id) => {
                // Also reroutes a reverse arrow, now offset
                self.draw_arrows_of(source);
                self.commit("create arrow")?;
                Ok(Some(id))
            }
            Err(reason) => {
                log::debug!("arrow {source} -> {target} rejected: {reason:?}");
                Ok(None)
            }
        }
    }

    pub fn remove_arrow(&mut self, id: ArrowId) -> Result<bool> {
        self.commit_pending()?;
        let Some(arrow) = self.graph.remove_arrow(id) else {
            return Ok(false);
        };
        self.renderer.remove_arrow(id);
        if let Some(reverse) = self.graph.find_arrow(arrow.target, arrow.source).map(|a| a.id) {
            self.draw_arrow(reverse);
        }
        if self.selection.arrow() == Some(id) {
            self.selection.set_arrow(None);
            self.selection_changed();
        }
        self.drop_stale_state()?;
        self.commit("delete arrow")?;
        Ok(true)
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    /// Capture the selected boxes and the arrows between them.
    pub fn copy(&mut self) -> bool {
        let capture = ClipboardCapture::capture(&self.graph, self.selection.boxes());
        if capture.is_empty() {
            return false;
        }
        log::debug!(
            "copied {} boxes, {} arrows",
            capture.boxes.len(),
            capture.arrows.len()
        );
        self.clipboard = Some(capture);
        true
    }

    pub fn cut(&mut self) -> Result<bool> {
        if !self.copy() {
            return Ok(false);
        }
        self.delete_selection()
    }

    /// Paste the clipboard near the last pointer position. The pasted
    /// boxes become the selection.
    pub fn paste(&mut self) -> Result<Vec<BoxId>> {
        self.commit_pending()?;
        let (dx, dy) = self.config.paste_offset;
        let origin = self.pointer + Vec2::new(dx, dy);
        let Some(capture) = self.clipboard.as_ref() else {
            return Ok(Vec::new());
        };
        let created = capture.paste_into(&mut self.graph, origin);
        self.place(&created, "paste")?;
        Ok(created)
    }

    /// Copy the selection next to itself without touching the clipboard.
    pub fn duplicate_selection(&mut self) -> Result<Vec<BoxId>> {
        self.commit_pending()?;
        let Some(bounds) = self.selection.bounds(&self.graph) else {
            return Ok(Vec::new());
        };
        let capture = ClipboardCapture::capture(&self.graph, self.selection.boxes());
        let (dx, dy) = self.config.duplicate_offset;
        let created = capture.paste_into(&mut self.graph, bounds.origin() + Vec2::new(dx, dy));
        self.place(&created, "duplicate")?;
        Ok(created)
    }

    /// Draw freshly inserted boxes, select them, commit.
    fn place(&mut self, created: &[BoxId], label: &str) -> Result<()> {
        if created.is_empty() {
            return Ok(());
        }
        for id in created {
            self.draw_box(*id, true);
        }
        for id in created {
            let arrows: Vec<ArrowId> = self.graph.outgoing(*id).iter().map(|a| a.id).collect();
            for arrow in arrows {
                self.draw_arrow(arrow);
            }
        }
        self.selection.replace(created.iter().copied());
        self.selection_changed();
        self.commit(label)
    }

    // ─── Context menus ───────────────────────────────────────────────────

    /// Run an entry of the open context menu and close it. `Ok(false)` if
    /// no menu is open or the entry doesn't belong to it.
    pub fn menu_action(&mut self, action: MenuAction) -> Result<bool> {
        let state = self.state;
        if !action.applies_to(state.kind()) {
            return Ok(false);
        }
        if let (InteractionState::BoxMenu { id, .. }, MenuAction::Edit) = (state, &action) {
            self.transition(InteractionState::EditingBox { id })?;
            return Ok(true);
        }
        self.transition(InteractionState::Idle)?;

        match (state, action) {
            (InteractionState::BoxMenu { id, .. }, action) => match action {
                MenuAction::AutoFit => self.auto_fit(id),
                MenuAction::Delete => self.remove_box(id),
                MenuAction::SetTag(color) => self.set_tag(TagTarget::Box(id), color.as_deref()),
                MenuAction::SetContentType(content) => self.set_content_type(id, content),
                MenuAction::LinkNote(path) => self.link_note(id, &path),
                MenuAction::Copy => {
                    self.target_selection(id);
                    Ok(self.copy())
                }
                MenuAction::Cut => {
                    self.target_selection(id);
                    self.cut()
                }
                _ => Ok(false),
            },
            (InteractionState::ArrowMenu { id, .. }, action) => match action {
                MenuAction::Delete => self.remove_arrow(id),
                MenuAction::SetTag(color) => self.set_tag(TagTarget::Arrow(id), color.as_deref()),
                _ => Ok(false),
            },
            (InteractionState::RoomMenu { at }, action) => match action {
                MenuAction::NewBox => {
                    self.create_box(at)?;
                    Ok(true)
                }
                MenuAction::Paste => {
                    self.pointer = at;
                    Ok(!self.paste()?.is_empty())
                }
                MenuAction::SelectAll => Ok(self.select_all()),
                _ => Ok(false),
            },
            _ => Ok(false),
        }
    }

    /// A box menu acts on the selection when the box is part of it, and
    /// on the box alone otherwise.
    fn target_selection(&mut self, id: BoxId) {
        if !self.selection.contains(id) {
            self.select_box(id, false);
        }
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn screen_to_graph(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.offset) / self.zoom).to_point()
    }

    pub fn graph_to_screen(&self, graph: Point) -> Point {
        (graph.to_vec2() * self.zoom + self.offset).to_point()
    }

    pub fn pan(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }
        self.offset += delta;
        self.renderer.set_viewport(self.offset, self.zoom);
        true
    }

    /// Multiply the zoom by `factor`, keeping the graph point under
    /// `screen` in place.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let zoom = (self.zoom * factor).clamp(self.config.min_zoom, self.config.max_zoom);
        if zoom == self.zoom {
            return false;
        }
        let anchor = self.screen_to_graph(screen);
        self.zoom = zoom;
        self.offset = screen.to_vec2() - anchor.to_vec2() * zoom;
        self.renderer.set_viewport(self.offset, self.zoom);
        true
    }

    pub fn reset_view(&mut self) -> bool {
        if self.offset == Vec2::ZERO && self.zoom == 1.0 {
            return false;
        }
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
        self.renderer.set_viewport(self.offset, self.zoom);
        true
    }
}
