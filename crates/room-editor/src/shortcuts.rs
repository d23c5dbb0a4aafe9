//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `RoomAction`s. `key` is the
//! DOM `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Copy,
    Cut,
    Paste,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ResetZoom,

    /// Escape: abort the gesture in progress, close menus, end editing.
    Cancel,
}

/// Resolves key events into room actions.
///
/// On macOS `meta` is ⌘, on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event. `None` if the combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<RoomAction> {
        let cmd = modifiers.command();

        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(RoomAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(RoomAction::Undo),
                "y" | "Y" => Some(RoomAction::Redo),
                "a" | "A" => Some(RoomAction::SelectAll),
                "d" | "D" => Some(RoomAction::Duplicate),
                "c" | "C" => Some(RoomAction::Copy),
                "x" | "X" => Some(RoomAction::Cut),
                "v" | "V" => Some(RoomAction::Paste),
                "=" | "+" => Some(RoomAction::ZoomIn),
                "-" => Some(RoomAction::ZoomOut),
                "0" => Some(RoomAction::ResetZoom),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(RoomAction::Delete),
            "Escape" => Some(RoomAction::Cancel),
            _ => None,
        }
    }
}
