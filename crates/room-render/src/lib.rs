pub mod adapter;
pub mod headless;
pub mod hit;

pub use adapter::{Cursor, Feedback, MenuKind, RenderAdapter};
pub use headless::HeadlessRenderer;
pub use hit::{BoxZone, HitZones, Target};
