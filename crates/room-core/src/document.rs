//! Persisted graph document.
//!
//! The JSON shape shared with the persistence collaborator:
//!
//! ```json
//! { "boxes":  [{ "id", "x", "y", "width", "height", "text", "type",
//!                "tag", "linkedNotePath" }],
//!   "arrows": [{ "sourceId", "targetId", "tag" }] }
//! ```
//!
//! Loading is lenient: arrows whose endpoints don't resolve, self-loops,
//! and repeated box IDs are dropped with a warning; the rest of the
//! document still loads.

use crate::error::Result;
use crate::id::BoxId;
use crate::model::{ArrowRejection, BoxNode, ContentType, Graph, clamp_size};
use crate::tags::Tag;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub boxes: Vec<BoxRecord>,
    #[serde(default)]
    pub arrows: Vec<ArrowRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxRecord {
    pub id: BoxId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub content: ContentType,
    #[serde(default)]
    pub tag: Option<Tag>,
    #[serde(default)]
    pub linked_note_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowRecord {
    pub source_id: BoxId,
    pub target_id: BoxId,
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl From<&BoxNode> for BoxRecord {
    fn from(b: &BoxNode) -> Self {
        Self {
            id: b.id,
            x: b.position.x,
            y: b.position.y,
            width: b.size.width,
            height: b.size.height,
            text: b.text.clone(),
            content: b.content,
            tag: b.tag.clone(),
            linked_note_path: b.linked_note_path.clone(),
        }
    }
}

impl BoxRecord {
    /// Sizes below the minimum box size are raised to it.
    pub fn to_node(&self) -> BoxNode {
        let mut node = BoxNode::new(
            self.id,
            Point::new(self.x, self.y),
            clamp_size(Size::new(self.width, self.height)),
        );
        node.text = self.text.clone();
        node.content = self.content;
        node.tag = self.tag.clone();
        node.linked_note_path = self.linked_note_path.clone();
        node
    }
}

/// Capture the graph as a document. Boxes follow the z-order; arrows
/// follow their source box.
pub fn serialize_state(graph: &Graph) -> GraphDocument {
    GraphDocument {
        boxes: graph.boxes().map(BoxRecord::from).collect(),
        arrows: graph
            .arrows()
            .into_iter()
            .map(|a| ArrowRecord {
                source_id: a.source,
                target_id: a.target,
                tag: a.tag.clone(),
            })
            .collect(),
    }
}

/// Rebuild a graph from a document, re-linking arrows through their
/// endpoint IDs.
pub fn deserialize_state(doc: &GraphDocument) -> Graph {
    let mut graph = Graph::new();
    for record in &doc.boxes {
        if !graph.insert_box(record.to_node()) {
            log::warn!("dropping box with repeated id {}", record.id);
        }
    }
    for record in &doc.arrows {
        match graph.add_arrow(record.source_id, record.target_id, record.tag.clone()) {
            Ok(_) => {}
            Err(ArrowRejection::MissingEndpoint) => log::warn!(
                "dropping arrow {} -> {}: endpoint not in document",
                record.source_id,
                record.target_id
            ),
            Err(reason) => log::warn!(
                "dropping arrow {} -> {}: {reason:?}",
                record.source_id,
                record.target_id
            ),
        }
    }
    log::debug!(
        "loaded graph: {} boxes, {} arrows",
        graph.len(),
        graph.arrow_count()
    );
    graph
}

impl GraphDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emits_documented_shape() {
        let mut g = Graph::new();
        let a = BoxId::intern("doc_a");
        let b = BoxId::intern("doc_b");
        g.insert_box(BoxNode::new(a, Point::new(1.0, 2.0), Size::new(3.0, 4.0)));
        g.insert_box(BoxNode::new(b, Point::new(5.0, 6.0), Size::new(7.0, 8.0)));
        g.add_arrow(a, b, None).unwrap();

        let value = serde_json::to_value(serialize_state(&g)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "boxes": [
                    { "id": "doc_a", "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0,
                      "text": "", "type": "text", "tag": null, "linkedNotePath": null },
                    { "id": "doc_b", "x": 5.0, "y": 6.0, "width": 7.0, "height": 8.0,
                      "text": "", "type": "text", "tag": null, "linkedNotePath": null }
                ],
                "arrows": [
                    { "sourceId": "doc_a", "targetId": "doc_b", "tag": null }
                ]
            })
        );
    }

    #[test]
    fn dangling_arrows_are_dropped() {
        let doc = GraphDocument::from_json(
            r#"{
                "boxes": [{ "id": 7, "x": 0, "y": 0, "width": 10, "height": 10 }],
                "arrows": [
                    { "sourceId": 7, "targetId": 8, "tag": null },
                    { "sourceId": 7, "targetId": 7 }
                ]
            }"#,
        )
        .unwrap();
        let g = deserialize_state(&doc);
        assert_eq!(g.len(), 1);
        assert_eq!(g.arrow_count(), 0);
        assert!(g.contains_box(BoxId::intern("7")));
    }

    #[test]
    fn degenerate_sizes_load_at_the_minimum() {
        let doc = GraphDocument::from_json(
            r#"{ "boxes": [{ "id": "flat", "x": 5, "y": 5, "width": 0, "height": 0 }], "arrows": [] }"#,
        )
        .unwrap();
        let g = deserialize_state(&doc);
        let node = g.get(BoxId::intern("flat")).unwrap();
        assert_eq!(node.size, crate::model::MIN_BOX_SIZE);
        assert_eq!(node.position, Point::new(5.0, 5.0));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(GraphDocument::from_json("{ \"boxes\": [").is_err());
    }
}
