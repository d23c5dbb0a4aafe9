//! Headless render adapter.
//!
//! Keeps the ID → handle registry a real renderer would keep, without
//! drawing anything, and records every request. Used by tests and by
//! hosts that render elsewhere (e.g. a server computing layouts).

use crate::adapter::{Cursor, Feedback, RenderAdapter};
use kurbo::{Rect, Vec2};
use room_core::geometry::ArrowPath;
use room_core::id::{ArrowId, BoxId};
use room_core::model::{Arrow, BoxNode};
use std::collections::HashMap;

/// Registry entry for a drawn box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxHandle {
    /// Changes on every fresh draw.
    pub handle: u32,
    pub rect: Rect,
    /// Rendered markup, rebuilt lazily after a fresh draw.
    pub markup_cache: Option<String>,
}

/// Registry entry for a drawn arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowHandle {
    pub handle: u32,
    pub path: ArrowPath,
}

/// One recorded adapter request.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Box { id: BoxId, fresh: bool },
    Arrow(ArrowId),
    RemoveBox(BoxId),
    RemoveArrow(ArrowId),
    Clear,
}

#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    boxes: HashMap<BoxId, BoxHandle>,
    arrows: HashMap<ArrowId, ArrowHandle>,
    next_handle: u32,
    pub calls: Vec<DrawCall>,
    pub cursor: Cursor,
    pub feedback: Option<Feedback>,
    pub editing: Option<BoxId>,
    pub selection: Vec<BoxId>,
    pub selected_arrow: Option<ArrowId>,
    pub viewport: (Vec2, f64),
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            viewport: (Vec2::ZERO, 1.0),
            ..Self::default()
        }
    }

    pub fn box_handle(&self, id: BoxId) -> Option<&BoxHandle> {
        self.boxes.get(&id)
    }

    pub fn arrow_handle(&self, id: ArrowId) -> Option<&ArrowHandle> {
        self.arrows.get(&id)
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn arrow_count(&self) -> usize {
        self.arrows.len()
    }

    /// Forget recorded calls (registry is kept).
    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    fn alloc(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl RenderAdapter for HeadlessRenderer {
    fn draw_box(&mut self, node: &BoxNode, fresh: bool) {
        self.calls.push(DrawCall::Box { id: node.id, fresh });
        if fresh || !self.boxes.contains_key(&node.id) {
            let handle = self.alloc();
            self.boxes.insert(
                node.id,
                BoxHandle {
                    handle,
                    rect: node.rect(),
                    markup_cache: None,
                },
            );
        }
        if let Some(entry) = self.boxes.get_mut(&node.id) {
            entry.rect = node.rect();
            if node.content.is_markup() {
                if entry.markup_cache.is_none() {
                    entry.markup_cache = Some(node.text.clone());
                }
            } else {
                entry.markup_cache = None;
            }
        }
    }

    fn draw_arrow(&mut self, arrow: &Arrow, path: &ArrowPath) {
        self.calls.push(DrawCall::Arrow(arrow.id));
        let handle = match self.arrows.get(&arrow.id) {
            Some(existing) => existing.handle,
            None => self.alloc(),
        };
        self.arrows.insert(arrow.id, ArrowHandle { handle, path: *path });
    }

    fn remove_box(&mut self, id: BoxId) {
        self.calls.push(DrawCall::RemoveBox(id));
        self.boxes.remove(&id);
    }

    fn remove_arrow(&mut self, id: ArrowId) {
        self.calls.push(DrawCall::RemoveArrow(id));
        self.arrows.remove(&id);
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
        self.boxes.clear();
        self.arrows.clear();
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn set_feedback(&mut self, feedback: Option<Feedback>) {
        self.feedback = feedback;
    }

    fn set_editing(&mut self, id: Option<BoxId>) {
        self.editing = id;
    }

    fn set_selection(&mut self, boxes: &[BoxId], arrow: Option<ArrowId>) {
        self.selection = boxes.to_vec();
        self.selected_arrow = arrow;
    }

    fn set_viewport(&mut self, offset: Vec2, zoom: f64) {
        self.viewport = (offset, zoom);
    }
}
