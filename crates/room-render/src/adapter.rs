//! Render adapter contract.
//!
//! The graph model never holds visual handles. The core tells an adapter
//! what changed, by ID, and the adapter keeps its own ID → handle
//! registry. `fresh = true` asks for full re-creation of a box's visual
//! state (content-type change, bulk load); `fresh = false` for an
//! incremental geometry/content refresh.

use crate::hit::{self, HitZones, Target};
use kurbo::{Point, Rect, Size, Vec2};
use room_core::geometry::ArrowPath;
use room_core::id::{ArrowId, BoxId};
use room_core::model::{Arrow, BoxNode, Graph};

/// Pointer cursor shapes the engine requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Move,
    Grab,
    Grabbing,
    Crosshair,
    ResizeDiagonal,
    Text,
    ContextMenu,
}

/// Which context menu is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Box(BoxId),
    Arrow(ArrowId),
    Room,
}

/// Transient, non-graph visuals for the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    /// Provisional connector while dragging out a new arrow.
    Connector { from: Point, to: Point },
    /// Rubber-band selection rectangle, graph coordinates.
    RubberBand(Rect),
    /// Context menu opened at a screen position.
    Menu { kind: MenuKind, at: Point },
}

/// Characters per line width and line height used by [`estimate_text_size`].
pub const CHAR_WIDTH: f64 = 7.0;
pub const LINE_HEIGHT: f64 = 18.0;

/// Monospace-ish estimate of the natural size of `text` wrapped at
/// `max_width`.
pub fn estimate_text_size(text: &str, max_width: f64) -> Size {
    let per_line = ((max_width / CHAR_WIDTH).floor() as usize).max(1);
    let mut lines = 0usize;
    let mut widest = 0usize;
    for line in text.split('\n') {
        let chars = line.chars().count();
        let wrapped = chars.div_ceil(per_line).max(1);
        lines += wrapped;
        widest = widest.max(chars.min(per_line));
    }
    Size::new(widest as f64 * CHAR_WIDTH, lines as f64 * LINE_HEIGHT)
}

/// Draws graph entities on request and answers geometry queries.
pub trait RenderAdapter {
    fn draw_box(&mut self, node: &BoxNode, fresh: bool);

    fn draw_arrow(&mut self, arrow: &Arrow, path: &ArrowPath);

    fn remove_box(&mut self, id: BoxId);

    fn remove_arrow(&mut self, id: ArrowId);

    /// Drop every visual (before a bulk redraw).
    fn clear(&mut self);

    fn set_cursor(&mut self, _cursor: Cursor) {}

    fn set_feedback(&mut self, _feedback: Option<Feedback>) {}

    fn set_editing(&mut self, _id: Option<BoxId>) {}

    fn set_selection(&mut self, _boxes: &[BoxId], _arrow: Option<ArrowId>) {}

    fn set_viewport(&mut self, _offset: Vec2, _zoom: f64) {}

    /// Natural size of a box's content reflowed to `max_width`.
    fn measure_content(&self, node: &BoxNode, max_width: f64) -> Size {
        estimate_text_size(&node.text, max_width)
    }

    /// Whether `point` lies on the rendered stroke of `path`.
    fn point_in_stroke(&self, path: &ArrowPath, point: Point, tolerance: f64) -> bool {
        hit::point_in_stroke(path, point, tolerance)
    }

    /// Entity under `point` (graph coordinates).
    fn hit_test(&self, graph: &Graph, point: Point, zones: &HitZones) -> Target {
        hit::hit_test(graph, point, zones, |path, p, tol| {
            self.point_in_stroke(path, p, tol)
        })
    }
}
