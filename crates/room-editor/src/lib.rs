pub mod clock;
pub mod config;
pub mod history;
pub mod input;
pub mod notify;
pub mod room;
pub mod selection;
pub mod shortcuts;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RoomConfig;
pub use history::{History, Snapshot};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use notify::{RoomEvent, SubscriptionId};
pub use room::{MenuAction, Room, TagTarget};
pub use selection::{ClipboardCapture, Selection};
pub use shortcuts::{RoomAction, ShortcutMap};
pub use state::{InteractionState, StateKind};
