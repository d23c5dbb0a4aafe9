//! Connector geometry: edge points and bezier control points.
//!
//! Pure functions over box rectangles. Each arrow is drawn as one cubic
//! bezier from the source box's boundary to the target box's boundary.
//! Control points leave each box along the outward normal of the side
//! the center line crosses. When two boxes are connected in both
//! directions, both curves are pushed apart along the perpendicular of
//! the box axis so they don't coincide.

use crate::id::ArrowId;
use crate::model::{Arrow, Graph};
use kurbo::{CubicBez, Point, Rect, Vec2};

/// Fraction of the center distance used as handle length.
pub const HANDLE_RATIO: f64 = 0.35;
/// Upper bound on handle length.
pub const MAX_HANDLE: f64 = 80.0;
/// Fraction of the center distance used to separate opposing arrows.
pub const OVERLAP_RATIO: f64 = 0.15;
/// Upper bound on the separation offset.
pub const MAX_OVERLAP_OFFSET: f64 = 15.0;

/// Box side a connector leaves or enters through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// Outward unit normal (y grows downward).
    pub fn normal(self) -> Vec2 {
        match self {
            Side::Left => Vec2::new(-1.0, 0.0),
            Side::Right => Vec2::new(1.0, 0.0),
            Side::Top => Vec2::new(0.0, -1.0),
            Side::Bottom => Vec2::new(0.0, 1.0),
        }
    }
}

/// Intersection of `rect`'s boundary with the ray from its center
/// toward `toward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePoint {
    pub point: Point,
    pub side: Side,
}

/// Find where the line from `rect`'s center to `toward` exits the box.
///
/// The line leaves through the left/right side when its slope is flatter
/// than the box's half-height / half-width ratio, otherwise through the
/// top/bottom side. A degenerate direction returns the center.
pub fn edge_point(rect: Rect, toward: Point) -> EdgePoint {
    let c = rect.center();
    let d = toward - c;
    let hw = rect.width() / 2.0;
    let hh = rect.height() / 2.0;

    if d.x == 0.0 && d.y == 0.0 {
        return EdgePoint {
            point: c,
            side: Side::Right,
        };
    }

    if d.x != 0.0 && d.y.abs() * hw <= d.x.abs() * hh {
        let sx = d.x.signum();
        let point = Point::new(c.x + sx * hw, c.y + d.y * hw / d.x.abs());
        let side = if sx > 0.0 { Side::Right } else { Side::Left };
        EdgePoint { point, side }
    } else {
        let sy = d.y.signum();
        let point = Point::new(c.x + d.x * hh / d.y.abs(), c.y + sy * hh);
        let side = if sy > 0.0 { Side::Bottom } else { Side::Top };
        EdgePoint { point, side }
    }
}

/// Control-point offset from an edge point for centers `distance` apart.
pub fn handle_distance(distance: f64) -> f64 {
    (HANDLE_RATIO * distance).min(MAX_HANDLE)
}

/// Perpendicular separation applied to bidirectional pairs.
pub fn overlap_offset(distance: f64) -> f64 {
    (OVERLAP_RATIO * distance).min(MAX_OVERLAP_OFFSET)
}

/// The four points of a connector curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowPath {
    pub start: Point,
    pub c1: Point,
    pub c2: Point,
    pub end: Point,
    pub start_side: Side,
    pub end_side: Side,
}

impl ArrowPath {
    pub fn to_cubic(&self) -> CubicBez {
        CubicBez::new(self.start, self.c1, self.c2, self.end)
    }
}

/// Route a connector between two box rectangles.
///
/// `bidirectional` is set when the opposite arrow also exists.
pub fn route(source: Rect, target: Rect, bidirectional: bool) -> ArrowPath {
    let sc = source.center();
    let tc = target.center();
    let start = edge_point(source, tc);
    let end = edge_point(target, sc);

    let axis = tc - sc;
    let distance = axis.hypot();
    let handle = handle_distance(distance);

    let mut c1 = start.point + start.side.normal() * handle;
    let mut c2 = end.point + end.side.normal() * handle;

    if bidirectional && distance > 0.0 {
        // Left-hand perpendicular of source → target; the reverse arrow
        // gets the opposite one since its axis is flipped.
        let perp = Vec2::new(-axis.y, axis.x) / distance;
        let shift = perp * overlap_offset(distance);
        c1 += shift;
        c2 += shift;
    }

    ArrowPath {
        start: start.point,
        c1,
        c2,
        end: end.point,
        start_side: start.side,
        end_side: end.side,
    }
}

/// Route one arrow of `graph`. `None` if an endpoint is missing.
pub fn route_arrow(graph: &Graph, arrow: &Arrow) -> Option<ArrowPath> {
    let source = graph.get(arrow.source)?;
    let target = graph.get(arrow.target)?;
    let bidirectional = graph.find_arrow(arrow.target, arrow.source).is_some();
    Some(route(source.rect(), target.rect(), bidirectional))
}

/// Route an arrow by ID.
pub fn route_arrow_id(graph: &Graph, id: ArrowId) -> Option<ArrowPath> {
    route_arrow(graph, graph.arrow(id)?)
}
