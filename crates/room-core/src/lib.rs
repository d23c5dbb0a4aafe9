pub mod document;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod tags;

pub use document::{GraphDocument, deserialize_state, serialize_state};
pub use error::{Result, RoomError};
pub use geometry::{ArrowPath, Side, edge_point, route, route_arrow};
pub use id::{ArrowId, BoxId};
pub use model::*;
pub use tags::{SharedTags, Tag, TagDictionary};

// Re-export kurbo types so downstream crates share one geometry vocabulary
pub use kurbo::{Point, Rect, Size, Vec2};
