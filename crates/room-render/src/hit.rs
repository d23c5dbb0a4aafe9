//! Hit testing: point → box zone, arrow, or empty canvas.
//!
//! Boxes are tested front-to-back (last painted = topmost) before arrows,
//! so a connector passing under a box never steals its clicks.

use kurbo::{ParamCurveNearest, Point, Rect};
use room_core::geometry::{ArrowPath, route_arrow};
use room_core::id::{ArrowId, BoxId};
use room_core::model::Graph;

/// Region of a box a pointer landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxZone {
    /// Between the connector band and the text area.
    Body,
    /// Outer band along the border; dragging from here draws an arrow.
    Connector,
    /// Inner text area.
    Text,
    /// Bottom-right corner handle.
    Resize,
}

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Box { id: BoxId, zone: BoxZone },
    Arrow(ArrowId),
    Canvas,
}

impl Target {
    pub fn box_id(&self) -> Option<BoxId> {
        match self {
            Target::Box { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Zone dimensions, in graph units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitZones {
    pub connector_band: f64,
    pub resize_handle: f64,
    pub text_inset: f64,
    pub arrow_tolerance: f64,
}

impl Default for HitZones {
    fn default() -> Self {
        Self {
            connector_band: 8.0,
            resize_handle: 12.0,
            text_inset: 16.0,
            arrow_tolerance: 6.0,
        }
    }
}

/// Classify a point inside `rect`. `None` if the point is outside.
pub fn box_zone(rect: Rect, p: Point, zones: &HitZones) -> Option<BoxZone> {
    if !rect.contains(p) {
        return None;
    }
    if p.x >= rect.x1 - zones.resize_handle && p.y >= rect.y1 - zones.resize_handle {
        return Some(BoxZone::Resize);
    }
    if !rect.inset(-zones.connector_band).contains(p) {
        return Some(BoxZone::Connector);
    }
    let text = rect.inset(-zones.text_inset);
    if text.width() > 0.0 && text.height() > 0.0 && text.contains(p) {
        return Some(BoxZone::Text);
    }
    Some(BoxZone::Body)
}

/// Whether `p` lies within `tolerance` of the curve.
pub fn point_in_stroke(path: &ArrowPath, p: Point, tolerance: f64) -> bool {
    let cubic = path.to_cubic();
    cubic.nearest(p, 1e-3).distance_sq <= tolerance * tolerance
}

/// Chord-sampling variant for adapters without curve math: tests the
/// polyline through `samples + 1` points of the curve.
pub fn point_near_chords(path: &ArrowPath, p: Point, tolerance: f64, samples: usize) -> bool {
    use kurbo::ParamCurve;
    let cubic = path.to_cubic();
    let samples = samples.max(1);
    let mut prev = cubic.eval(0.0);
    for i in 1..=samples {
        let next = cubic.eval(i as f64 / samples as f64);
        if segment_distance_sq(prev, next, p) <= tolerance * tolerance {
            return true;
        }
        prev = next;
    }
    false
}

fn segment_distance_sq(a: Point, b: Point, p: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot2();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot2()
}

/// Find the entity at `p` (graph coordinates).
pub fn hit_test(
    graph: &Graph,
    p: Point,
    zones: &HitZones,
    in_stroke: impl Fn(&ArrowPath, Point, f64) -> bool,
) -> Target {
    for node in graph.boxes().rev() {
        if let Some(zone) = box_zone(node.rect(), p, zones) {
            return Target::Box { id: node.id, zone };
        }
    }
    // Topmost source box first, latest arrow first
    for arrow in graph.arrows().into_iter().rev() {
        if let Some(path) = route_arrow(graph, arrow)
            && in_stroke(&path, p, zones.arrow_tolerance)
        {
            log::trace!("hit {} at ({:.1}, {:.1})", arrow.id, p.x, p.y);
            return Target::Arrow(arrow.id);
        }
    }
    Target::Canvas
}

/// Boxes whose bounding box intersects `rect` (rubber-band selection).
pub fn hit_test_rect(graph: &Graph, rect: Rect) -> Vec<BoxId> {
    graph.boxes_in_rect(rect)
}
