//! Core graph model for Room canvases.
//!
//! Boxes are nodes of a stable directed graph and arrows are its edges,
//! running source → target. An arrow is owned by its source box: it is
//! an outgoing edge of exactly one node, and removing either endpoint
//! removes it. A separate ordering sequence holds the z-order of boxes,
//! back to front.

use crate::id::{ArrowId, BoxId};
use crate::tags::Tag;
use kurbo::{Point, Rect, Size, Vec2};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Size of a freshly created box.
pub const DEFAULT_BOX_SIZE: Size = Size::new(160.0, 80.0);

/// Smallest size resize and auto-fit may produce.
pub const MIN_BOX_SIZE: Size = Size::new(16.0, 16.0);

// ─── Boxes ───────────────────────────────────────────────────────────────

/// How a box's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Plain text.
    #[default]
    Text,
    /// Lightweight markup.
    Markdown,
    /// Raw markup.
    Html,
    /// Reference to a linked note document.
    Book,
}

impl ContentType {
    /// Whether the renderer keeps a markup cache for this type.
    pub fn is_markup(self) -> bool {
        matches!(self, ContentType::Markdown | ContentType::Html)
    }
}

/// A rectangular content node.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    pub id: BoxId,
    /// Top-left corner in graph coordinates.
    pub position: Point,
    pub size: Size,
    /// Size the box was created with; auto-fit reflows text to its width.
    pub default_size: Size,
    pub text: String,
    pub content: ContentType,
    pub tag: Option<Tag>,
    pub linked_note_path: Option<String>,
}

impl BoxNode {
    pub fn new(id: BoxId, position: Point, size: Size) -> Self {
        Self {
            id,
            position,
            size,
            default_size: DEFAULT_BOX_SIZE,
            text: String::new(),
            content: ContentType::Text,
            tag: None,
            linked_note_path: None,
        }
    }

    /// A default-sized box centered at `center`.
    pub fn centered(id: BoxId, center: Point) -> Self {
        let origin = center - Vec2::new(DEFAULT_BOX_SIZE.width, DEFAULT_BOX_SIZE.height) / 2.0;
        Self::new(id, origin, DEFAULT_BOX_SIZE)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }
}

/// Clamp a size to [`MIN_BOX_SIZE`].
pub fn clamp_size(size: Size) -> Size {
    Size::new(
        size.width.max(MIN_BOX_SIZE.width),
        size.height.max(MIN_BOX_SIZE.height),
    )
}

/// AABB overlap, touching edges excluded.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

// ─── Arrows ──────────────────────────────────────────────────────────────

/// A directed connector from `source` to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub id: ArrowId,
    pub source: BoxId,
    pub target: BoxId,
    pub tag: Option<Tag>,
}

/// Why an arrow could not be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowRejection {
    SelfLoop,
    MissingEndpoint,
    Duplicate,
}

/// Everything `remove_box` took out of the graph.
#[derive(Debug, Clone)]
pub struct RemovedBox {
    pub node: BoxNode,
    pub arrows: SmallVec<[Arrow; 4]>,
}

// ─── Graph ───────────────────────────────────────────────────────────────

/// The set of boxes and arrows on one canvas.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: StableDiGraph<BoxNode, Arrow>,
    id_index: HashMap<BoxId, NodeIndex>,
    arrow_index: HashMap<ArrowId, EdgeIndex>,
    /// Z-order, back to front. Doubles as the persisted box order.
    order: Vec<NodeIndex>,
    next_arrow: u64,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn arrow_count(&self) -> usize {
        self.arrow_index.len()
    }

    /// An ID no box in this graph uses.
    pub fn fresh_box_id(&self) -> BoxId {
        loop {
            let id = BoxId::with_prefix("box");
            if !self.id_index.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert a box on top of the z-order. Returns `false` (and leaves the
    /// graph unchanged) when the ID is already taken.
    pub fn insert_box(&mut self, node: BoxNode) -> bool {
        if self.id_index.contains_key(&node.id) {
            log::warn!("box id {} already present, insert rejected", node.id);
            return false;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.order.push(idx);
        true
    }

    pub fn contains_box(&self, id: BoxId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: BoxId) -> Option<&BoxNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut BoxNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// Boxes in z-order, back to front.
    pub fn boxes(&self) -> impl DoubleEndedIterator<Item = &BoxNode> + '_ {
        self.order.iter().map(|idx| &self.graph[*idx])
    }

    pub fn box_ids(&self) -> Vec<BoxId> {
        self.boxes().map(|b| b.id).collect()
    }

    /// The box painted last.
    pub fn topmost(&self) -> Option<BoxId> {
        self.order.last().map(|idx| self.graph[*idx].id)
    }

    /// Position of a box in the z-order (0 = bottom).
    pub fn z_index(&self, id: BoxId) -> Option<usize> {
        let idx = self.id_index.get(&id)?;
        self.order.iter().position(|i| i == idx)
    }

    /// Move a box to the end of the ordering sequence.
    /// Returns `true` if the order changed.
    pub fn raise(&mut self, id: BoxId) -> bool {
        let Some(&idx) = self.id_index.get(&id) else {
            return false;
        };
        let Some(pos) = self.order.iter().position(|i| *i == idx) else {
            return false;
        };
        if pos + 1 == self.order.len() {
            return false;
        }
        self.order.remove(pos);
        self.order.push(idx);
        true
    }

    /// Remove a box together with every arrow it sources or targets.
    pub fn remove_box(&mut self, id: BoxId) -> Option<RemovedBox> {
        let idx = self.id_index.remove(&id)?;
        let mut arrows: SmallVec<[Arrow; 4]> = SmallVec::new();
        for dir in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, dir) {
                arrows.push(edge.weight().clone());
            }
        }
        arrows.sort_by_key(|a| a.id);
        for arrow in &arrows {
            self.arrow_index.remove(&arrow.id);
        }
        self.order.retain(|i| *i != idx);
        // StableGraph drops incident edges with the node.
        let node = self.graph.remove_node(idx)?;
        Some(RemovedBox { node, arrows })
    }

    // ─── Arrows ──────────────────────────────────────────────────────────

    /// Insert an arrow `source → target`.
    ///
    /// Self-loops, dangling endpoints, and a second arrow in the same
    /// direction are rejected.
    pub fn add_arrow(
        &mut self,
        source: BoxId,
        target: BoxId,
        tag: Option<Tag>,
    ) -> Result<ArrowId, ArrowRejection> {
        if source == target {
            return Err(ArrowRejection::SelfLoop);
        }
        let (Some(&s), Some(&t)) = (self.id_index.get(&source), self.id_index.get(&target)) else {
            return Err(ArrowRejection::MissingEndpoint);
        };
        if self.graph.find_edge(s, t).is_some() {
            return Err(ArrowRejection::Duplicate);
        }
        let id = ArrowId(self.next_arrow);
        self.next_arrow += 1;
        let edge = self.graph.add_edge(
            s,
            t,
            Arrow {
                id,
                source,
                target,
                tag,
            },
        );
        self.arrow_index.insert(id, edge);
        Ok(id)
    }

    pub fn remove_arrow(&mut self, id: ArrowId) -> Option<Arrow> {
        let edge = self.arrow_index.remove(&id)?;
        self.graph.remove_edge(edge)
    }

    pub fn arrow(&self, id: ArrowId) -> Option<&Arrow> {
        self.arrow_index
            .get(&id)
            .and_then(|e| self.graph.edge_weight(*e))
    }

    pub fn arrow_mut(&mut self, id: ArrowId) -> Option<&mut Arrow> {
        let edge = *self.arrow_index.get(&id)?;
        self.graph.edge_weight_mut(edge)
    }

    /// The arrow `source → target`, if any.
    pub fn find_arrow(&self, source: BoxId, target: BoxId) -> Option<&Arrow> {
        let s = *self.id_index.get(&source)?;
        let t = *self.id_index.get(&target)?;
        self.graph
            .find_edge(s, t)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// A box's outgoing arrows, in creation order.
    pub fn outgoing(&self, id: BoxId) -> Vec<&Arrow> {
        let Some(&idx) = self.id_index.get(&id) else {
            return Vec::new();
        };
        let mut arrows: Vec<&Arrow> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight())
            .collect();
        arrows.sort_by_key(|a| a.id);
        arrows
    }

    /// IDs of every arrow that starts or ends at `id`.
    pub fn incident_arrows(&self, id: BoxId) -> SmallVec<[ArrowId; 8]> {
        let mut out = SmallVec::new();
        if let Some(&idx) = self.id_index.get(&id) {
            for dir in [Direction::Outgoing, Direction::Incoming] {
                out.extend(self.graph.edges_directed(idx, dir).map(|e| e.weight().id));
            }
        }
        out.sort();
        out
    }

    /// All arrows, grouped by source box in z-order, each group in
    /// creation order.
    pub fn arrows(&self) -> Vec<&Arrow> {
        self.boxes().flat_map(|b| self.outgoing(b.id)).collect()
    }

    /// Clear `tag` from every box and arrow whose tag matches `pred`.
    /// Returns how many entities changed.
    pub fn clear_tags_where(&mut self, mut pred: impl FnMut(&Tag) -> bool) -> usize {
        let mut cleared = 0;
        for &idx in &self.order {
            let node = &mut self.graph[idx];
            if node.tag.as_ref().is_some_and(&mut pred) {
                node.tag = None;
                cleared += 1;
            }
        }
        for &edge in self.arrow_index.values() {
            if let Some(arrow) = self.graph.edge_weight_mut(edge)
                && arrow.tag.as_ref().is_some_and(&mut pred)
            {
                arrow.tag = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Boxes whose bounding box intersects `rect`, in z-order.
    pub fn boxes_in_rect(&self, rect: Rect) -> Vec<BoxId> {
        self.boxes()
            .filter(|b| rects_intersect(b.rect(), rect))
            .map(|b| b.id)
            .collect()
    }
}
