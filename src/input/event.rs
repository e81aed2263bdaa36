//! Platform pointer events and sample extraction
//!
//! The host shell (a webview, a native window, a test) delivers pointer
//! input as [`PointerEvent`] values. [`extract_samples`] localizes them
//! into surface space, honoring coalesced sub-frame samples when present.

use serde::{Deserialize, Serialize};

use super::{DeviceKind, PointerSample};

/// A sub-frame coalesced reading attached to a platform event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoalescedSample {
    /// X coordinate in client space
    pub client_x: f64,
    /// Y coordinate in client space
    pub client_y: f64,
    /// Pressure value (0.0 - 1.0)
    pub pressure: f64,
}

/// Platform-neutral pointer event as delivered by the host shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerEvent {
    /// X coordinate in client space
    pub client_x: f64,
    /// Y coordinate in client space
    pub client_y: f64,
    /// Pressure value (0.0 - 1.0)
    pub pressure: f64,
    /// Platform device-kind string (e.g. "pen"); unknown values map to mouse
    pub pointer_type: String,
    /// Higher-resolution sub-frame samples, oldest first
    #[serde(default)]
    pub coalesced: Vec<CoalescedSample>,
}

/// Top-left corner of the drawing surface in client coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SurfaceOffset {
    pub left: f64,
    pub top: f64,
}

impl SurfaceOffset {
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top }
    }
}

/// Extract surface-local samples from a platform event.
///
/// Coalesced samples are used when present, preserving their chronological
/// order; an event without them yields its own single reading. Coordinates
/// are translated by `offset` and scaled by `1 / zoom`.
pub fn extract_samples(
    event: &PointerEvent,
    offset: SurfaceOffset,
    zoom: f64,
) -> Vec<PointerSample> {
    let scale = if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        tracing::warn!("invalid zoom factor {zoom}, falling back to 1.0");
        1.0
    };

    let device = DeviceKind::parse(&event.pointer_type);
    let localize = |client_x: f64, client_y: f64, pressure: f64| {
        PointerSample::with_device(
            (client_x - offset.left) / scale,
            (client_y - offset.top) / scale,
            pressure,
            device,
        )
    };

    if event.coalesced.is_empty() {
        return vec![localize(event.client_x, event.client_y, event.pressure)];
    }

    event
        .coalesced
        .iter()
        .map(|c| localize(c.client_x, c.client_y, c.pressure))
        .collect()
}
