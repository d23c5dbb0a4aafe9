//! Room tunables.

use room_core::error::Result;
use room_core::model::{DEFAULT_BOX_SIZE, MIN_BOX_SIZE};
use room_render::hit::HitZones;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomConfig {
    /// Delay separating a stationary click from the start of a drag.
    pub hold_threshold_ms: u64,
    /// Screen distance the pointer may wander before the hold threshold
    /// without cancelling the pending drag.
    pub hold_slop: f64,
    /// Maximum gap between two presses on the same target.
    pub double_click_ms: u64,
    /// Snapshots kept by the history, base state included.
    pub history_capacity: usize,
    pub default_box_width: f64,
    pub default_box_height: f64,
    pub min_box_width: f64,
    pub min_box_height: f64,
    /// Offset of pasted boxes from the last pointer position.
    pub paste_offset: (f64, f64),
    /// Offset of duplicated boxes from their originals.
    pub duplicate_offset: (f64, f64),
    pub arrow_tolerance: f64,
    pub autofit_padding: f64,
    pub connector_band: f64,
    pub resize_handle: f64,
    pub text_inset: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            hold_threshold_ms: 200,
            hold_slop: 3.0,
            double_click_ms: 300,
            history_capacity: 50,
            default_box_width: DEFAULT_BOX_SIZE.width,
            default_box_height: DEFAULT_BOX_SIZE.height,
            min_box_width: MIN_BOX_SIZE.width,
            min_box_height: MIN_BOX_SIZE.height,
            paste_offset: (20.0, 20.0),
            duplicate_offset: (20.0, 20.0),
            arrow_tolerance: 6.0,
            autofit_padding: 12.0,
            connector_band: 8.0,
            resize_handle: 12.0,
            text_inset: 16.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
        }
    }
}

impl RoomConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn hit_zones(&self) -> HitZones {
        HitZones {
            connector_band: self.connector_band,
            resize_handle: self.resize_handle,
            text_inset: self.text_inset,
            arrow_tolerance: self.arrow_tolerance,
        }
    }
}
