use lasso::{Spur, ThreadedRodeo};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for box IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind generated box IDs. Shared by every graph so that two
/// canvases never hand out the same fresh ID.
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A lightweight, interned identifier for boxes.
/// Internally a 4-byte `Spur` index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxId(Spur);

impl BoxId {
    /// Intern a string as a BoxId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        BoxId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate an ID with a prefix (e.g. `box_1`, `box_2`).
    ///
    /// Uniqueness within a graph is checked by `Graph::fresh_box_id`,
    /// since loaded documents may already use names of this shape.
    pub fn with_prefix(prefix: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BoxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Documents written by older builds store numeric IDs; both forms are
/// accepted and normalized to their decimal string.
impl<'de> Deserialize<'de> for BoxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BoxIdVisitor;

        impl Visitor<'_> for BoxIdVisitor {
            type Value = BoxId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer box id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BoxId, E> {
                Ok(BoxId::intern(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BoxId, E> {
                Ok(BoxId::intern(&v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<BoxId, E> {
                Ok(BoxId::intern(&v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<BoxId, E> {
                if v.fract() == 0.0 && v.is_finite() {
                    Ok(BoxId::intern(&format!("{}", v as i64)))
                } else {
                    Err(E::custom(format!("non-integer box id {v}")))
                }
            }
        }

        deserializer.deserialize_any(BoxIdVisitor)
    }
}

/// Identifier of an arrow within one graph.
///
/// Assigned when the arrow is inserted and used by the render adapter to
/// look up the arrow's visual handle. Not persisted: a reloaded graph
/// assigns new arrow IDs in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrowId(pub u64);

impl fmt::Display for ArrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arrow_{}", self.0)
    }
}
