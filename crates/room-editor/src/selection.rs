//! Selection set and clipboard.
//!
//! The clipboard holds one capture: the selected boxes relative to the
//! selection's minimum corner, plus the arrows running between them.
//! Arrows crossing the selection boundary are not captured.

use kurbo::{Point, Rect, Size, Vec2};
use room_core::id::{ArrowId, BoxId};
use room_core::model::{BoxNode, ContentType, Graph};
use room_core::tags::Tag;
use std::collections::{HashMap, HashSet};

/// Selected boxes in selection order, plus at most one selected arrow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    boxes: Vec<BoxId>,
    arrow: Option<ArrowId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxes(&self) -> &[BoxId] {
        &self.boxes
    }

    pub fn arrow(&self) -> Option<ArrowId> {
        self.arrow
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.boxes.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.arrow.is_none()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Add a box. Returns `true` if it wasn't selected yet.
    pub fn add(&mut self, id: BoxId) -> bool {
        if self.boxes.contains(&id) {
            return false;
        }
        self.boxes.push(id);
        true
    }

    pub fn remove(&mut self, id: BoxId) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|b| *b != id);
        self.boxes.len() != before
    }

    pub fn set_arrow(&mut self, arrow: Option<ArrowId>) {
        self.arrow = arrow;
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
        self.arrow = None;
    }

    pub fn replace(&mut self, ids: impl IntoIterator<Item = BoxId>) {
        self.boxes.clear();
        for id in ids {
            self.add(id);
        }
        self.arrow = None;
    }

    /// Drop entries that no longer exist in `graph`.
    /// Returns `true` if anything was dropped.
    pub fn prune(&mut self, graph: &Graph) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|id| graph.contains_box(*id));
        let mut changed = self.boxes.len() != before;
        if let Some(a) = self.arrow
            && graph.arrow(a).is_none()
        {
            self.arrow = None;
            changed = true;
        }
        changed
    }

    /// Bounding rectangle of the selected boxes.
    pub fn bounds(&self, graph: &Graph) -> Option<Rect> {
        self.boxes
            .iter()
            .filter_map(|id| graph.get(*id))
            .map(|b| b.rect())
            .reduce(|a, b| a.union(b))
    }
}

/// A box as captured by copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBox {
    pub source_id: BoxId,
    /// Offset of the box origin from the capture's minimum corner.
    pub offset: Vec2,
    pub size: Size,
    pub text: String,
    pub content: ContentType,
    pub tag: Option<Tag>,
    pub linked_note_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedArrow {
    pub source: BoxId,
    pub target: BoxId,
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipboardCapture {
    pub boxes: Vec<CapturedBox>,
    pub arrows: Vec<CapturedArrow>,
}

impl ClipboardCapture {
    /// Capture `ids` (in the given order) from `graph`.
    pub fn capture(graph: &Graph, ids: &[BoxId]) -> Self {
        let nodes: Vec<&BoxNode> = ids.iter().filter_map(|id| graph.get(*id)).collect();
        let Some(min) = nodes.iter().map(|n| n.position).reduce(|a, b| {
            Point::new(a.x.min(b.x), a.y.min(b.y))
        }) else {
            return Self::default();
        };
        let set: HashSet<BoxId> = nodes.iter().map(|n| n.id).collect();

        let boxes = nodes
            .iter()
            .map(|n| CapturedBox {
                source_id: n.id,
                offset: n.position - min,
                size: n.size,
                text: n.text.clone(),
                content: n.content,
                tag: n.tag.clone(),
                linked_note_path: n.linked_note_path.clone(),
            })
            .collect();

        let arrows = nodes
            .iter()
            .flat_map(|n| graph.outgoing(n.id))
            .filter(|a| set.contains(&a.target))
            .map(|a| CapturedArrow {
                source: a.source,
                target: a.target,
                tag: a.tag.clone(),
            })
            .collect();

        Self { boxes, arrows }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Materialize the capture into `graph` with its minimum corner at
    /// `origin`. Every box gets a fresh ID; arrows are remapped through
    /// the translation table. Returns the new box IDs in capture order.
    pub fn paste_into(&self, graph: &mut Graph, origin: Point) -> Vec<BoxId> {
        let mut id_map: HashMap<BoxId, BoxId> = HashMap::with_capacity(self.boxes.len());
        let mut created = Vec::with_capacity(self.boxes.len());

        for captured in &self.boxes {
            let id = graph.fresh_box_id();
            let mut node = BoxNode::new(id, origin + captured.offset, captured.size);
            node.text = captured.text.clone();
            node.content = captured.content;
            node.tag = captured.tag.clone();
            node.linked_note_path = captured.linked_note_path.clone();
            if graph.insert_box(node) {
                id_map.insert(captured.source_id, id);
                created.push(id);
            }
        }

        for arrow in &self.arrows {
            if let (Some(&s), Some(&t)) = (id_map.get(&arrow.source), id_map.get(&arrow.target))
                && let Err(reason) = graph.add_arrow(s, t, arrow.tag.clone())
            {
                log::warn!("paste: arrow {s} -> {t} rejected: {reason:?}");
            }
        }
        created
    }
}
