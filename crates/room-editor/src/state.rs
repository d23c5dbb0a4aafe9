//! Interaction states and the transition table.
//!
//! `next_state` maps (current state, input class) to the next state. The
//! room runs the exit action of the current state and the entry action
//! of the next one for every transition it returns, whichever input
//! produced it.

use kurbo::Point;
use room_core::id::{ArrowId, BoxId};
use room_render::adapter::Cursor;
use room_render::hit::{BoxZone, Target};

/// Discriminant of [`InteractionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    SelectingBox,
    CreatingArrow,
    ResizingBox,
    SelectingArrow,
    RubberBandSelecting,
    MovingBoxes,
    Panning,
    EditingBox,
    CreatingBox,
    BoxMenu,
    ArrowMenu,
    RoomMenu,
}

impl StateKind {
    /// States that follow a held pointer.
    pub fn is_drag(self) -> bool {
        matches!(
            self,
            StateKind::CreatingArrow
                | StateKind::ResizingBox
                | StateKind::RubberBandSelecting
                | StateKind::MovingBoxes
                | StateKind::Panning
        )
    }

    pub fn is_menu(self) -> bool {
        matches!(
            self,
            StateKind::BoxMenu | StateKind::ArrowMenu | StateKind::RoomMenu
        )
    }

    /// States entered on a press that end on release.
    pub fn holds_pointer(self) -> bool {
        self.is_drag() || matches!(self, StateKind::SelectingBox | StateKind::CreatingBox)
    }

    pub fn cursor(self) -> Cursor {
        match self {
            StateKind::MovingBoxes => Cursor::Move,
            StateKind::Panning => Cursor::Grabbing,
            StateKind::ResizingBox => Cursor::ResizeDiagonal,
            StateKind::CreatingArrow | StateKind::RubberBandSelecting => Cursor::Crosshair,
            StateKind::EditingBox => Cursor::Text,
            StateKind::BoxMenu | StateKind::ArrowMenu | StateKind::RoomMenu => Cursor::ContextMenu,
            StateKind::Idle
            | StateKind::SelectingBox
            | StateKind::SelectingArrow
            | StateKind::CreatingBox => Cursor::Default,
        }
    }
}

/// The current interaction, with the entity it concerns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    SelectingBox { id: BoxId },
    CreatingArrow { source: BoxId },
    ResizingBox { id: BoxId },
    SelectingArrow { id: ArrowId },
    RubberBandSelecting,
    MovingBoxes,
    Panning,
    EditingBox { id: BoxId },
    /// Box just placed by a double-click; release starts editing it.
    CreatingBox { id: BoxId },
    /// Menus remember where they were opened, in graph coordinates.
    BoxMenu { id: BoxId, at: Point },
    ArrowMenu { id: ArrowId, at: Point },
    RoomMenu { at: Point },
}

impl InteractionState {
    pub fn kind(&self) -> StateKind {
        match self {
            InteractionState::Idle => StateKind::Idle,
            InteractionState::SelectingBox { .. } => StateKind::SelectingBox,
            InteractionState::CreatingArrow { .. } => StateKind::CreatingArrow,
            InteractionState::ResizingBox { .. } => StateKind::ResizingBox,
            InteractionState::SelectingArrow { .. } => StateKind::SelectingArrow,
            InteractionState::RubberBandSelecting => StateKind::RubberBandSelecting,
            InteractionState::MovingBoxes => StateKind::MovingBoxes,
            InteractionState::Panning => StateKind::Panning,
            InteractionState::EditingBox { .. } => StateKind::EditingBox,
            InteractionState::CreatingBox { .. } => StateKind::CreatingBox,
            InteractionState::BoxMenu { .. } => StateKind::BoxMenu,
            InteractionState::ArrowMenu { .. } => StateKind::ArrowMenu,
            InteractionState::RoomMenu { .. } => StateKind::RoomMenu,
        }
    }
}

/// Entity class under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetClass {
    BoxBody,
    BoxConnector,
    BoxText,
    BoxResize,
    Arrow,
    Canvas,
}

impl From<&Target> for TargetClass {
    fn from(t: &Target) -> Self {
        match t {
            Target::Box { zone, .. } => match zone {
                BoxZone::Body => TargetClass::BoxBody,
                BoxZone::Connector => TargetClass::BoxConnector,
                BoxZone::Text => TargetClass::BoxText,
                BoxZone::Resize => TargetClass::BoxResize,
            },
            Target::Arrow(_) => TargetClass::Arrow,
            Target::Canvas => TargetClass::Canvas,
        }
    }
}

/// Drag that starts once the hold threshold elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldIntent {
    Move,
    Resize,
    Pan,
}

/// Input after classification against the entity under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    Press(crate::input::PointerButton, TargetClass),
    DoubleClick(TargetClass),
    HoldElapsed(HoldIntent),
    Release,
    /// Escape.
    Cancel,
    /// Pointer left the canvas.
    Leave,
}

/// The transition table. `None` means the input doesn't change state.
pub fn next_state(current: StateKind, input: InputClass) -> Option<StateKind> {
    use crate::input::PointerButton::{Auxiliary, Primary, Secondary};
    use InputClass::*;
    use StateKind::*;
    use TargetClass::*;

    match (current, input) {
        // A held pointer ignores further presses until released.
        (s, Press(..) | DoubleClick(_)) if s.holds_pointer() => None,

        (_, Press(Secondary, BoxBody | BoxConnector | BoxText | BoxResize)) => Some(BoxMenu),
        (_, Press(Secondary, Arrow)) => Some(ArrowMenu),
        (_, Press(Secondary, Canvas)) => Some(RoomMenu),

        (_, Press(Primary, BoxBody | BoxText | BoxResize)) => Some(SelectingBox),
        (_, Press(Primary, BoxConnector)) => Some(CreatingArrow),
        (_, Press(Primary, Arrow)) => Some(SelectingArrow),
        (_, Press(Primary, Canvas)) => Some(RubberBandSelecting),

        (_, Press(Auxiliary, BoxBody | BoxConnector | BoxText | BoxResize)) => Some(SelectingBox),
        (_, Press(Auxiliary, Arrow | Canvas)) => Some(Idle),

        (_, DoubleClick(BoxText)) => Some(EditingBox),
        (_, DoubleClick(BoxBody | BoxResize)) => Some(SelectingBox),
        (_, DoubleClick(BoxConnector)) => Some(CreatingArrow),
        (_, DoubleClick(Arrow)) => Some(SelectingArrow),
        (_, DoubleClick(Canvas)) => Some(CreatingBox),

        (SelectingBox, HoldElapsed(HoldIntent::Move)) => Some(MovingBoxes),
        (SelectingBox, HoldElapsed(HoldIntent::Resize)) => Some(ResizingBox),
        (Idle, HoldElapsed(HoldIntent::Pan)) => Some(Panning),
        (_, HoldElapsed(_)) => None,

        (CreatingBox, Release) => Some(EditingBox),
        (s, Release) if s.holds_pointer() => Some(Idle),
        (_, Release) => None,

        (Idle, Cancel) => None,
        (_, Cancel) => Some(Idle),

        (s, Leave) if s.holds_pointer() => Some(Idle),
        (_, Leave) => None,
    }
}
