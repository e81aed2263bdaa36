//! Input module - pointer samples and platform event extraction

mod event;

pub use event::{extract_samples, CoalescedSample, PointerEvent, SurfaceOffset};

use serde::{Deserialize, Serialize};

/// Kind of pointing device that produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

impl DeviceKind {
    /// Parse a platform device-kind string.
    ///
    /// Unknown or garbage values fall back to `Mouse` instead of failing;
    /// the empty string is the platform's own "unknown" marker and maps to
    /// `Mouse` silently.
    pub fn parse(value: &str) -> Self {
        match value {
            "mouse" | "" => Self::Mouse,
            "touch" => Self::Touch,
            "pen" => Self::Pen,
            other => {
                tracing::warn!("unknown device kind {other:?}, treating as mouse");
                Self::Mouse
            }
        }
    }
}

/// One raw pointer/stylus reading in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// X coordinate in surface space
    pub x: f64,
    /// Y coordinate in surface space
    pub y: f64,
    /// Pressure value (0.0 - 1.0)
    pub pressure: f64,
    /// Device that produced the sample
    pub device: DeviceKind,
}

impl PointerSample {
    /// Create a new sample from a mouse-like source.
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            x,
            y,
            pressure: clamp_pressure(pressure),
            device: DeviceKind::Mouse,
        }
    }

    /// Create with an explicit device kind.
    pub fn with_device(x: f64, y: f64, pressure: f64, device: DeviceKind) -> Self {
        Self {
            x,
            y,
            pressure: clamp_pressure(pressure),
            device,
        }
    }

    /// Euclidean distance to another sample's position.
    pub fn distance_to(&self, other: &PointerSample) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Same sample at new coordinates; pressure and device carry over.
    pub(crate) fn at(&self, x: f64, y: f64) -> Self {
        Self { x, y, ..*self }
    }
}

/// Clamp a pressure reading to the valid range; non-finite input maps to 0.
pub fn clamp_pressure(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_sample_creation() {
        let sample = PointerSample::new(100.0, 200.0, 0.5);

        assert_eq!(sample.x, 100.0);
        assert_eq!(sample.y, 200.0);
        assert_eq!(sample.pressure, 0.5);
        assert_eq!(sample.device, DeviceKind::Mouse);
    }

    #[test]
    fn test_pressure_clamping() {
        let sample = PointerSample::new(0.0, 0.0, 1.5);
        assert_eq!(sample.pressure, 1.0);

        let sample = PointerSample::new(0.0, 0.0, -0.5);
        assert_eq!(sample.pressure, 0.0);

        let sample = PointerSample::new(0.0, 0.0, f64::NAN);
        assert_eq!(sample.pressure, 0.0);
    }

    #[test]
    fn test_distance() {
        let a = PointerSample::new(0.0, 0.0, 0.5);
        let b = PointerSample::new(3.0, 4.0, 0.5);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_device_kind_parse() {
        assert_eq!(DeviceKind::parse("pen"), DeviceKind::Pen);
        assert_eq!(DeviceKind::parse("touch"), DeviceKind::Touch);
        assert_eq!(DeviceKind::parse("mouse"), DeviceKind::Mouse);
        // Unknown and empty strings default to mouse rather than failing
        assert_eq!(DeviceKind::parse(""), DeviceKind::Mouse);
        assert_eq!(DeviceKind::parse("eraser3000"), DeviceKind::Mouse);
    }

    #[test]
    fn test_device_kind_serialization() {
        let encoded = serde_json::to_string(&DeviceKind::Pen).expect("serialize device kind");
        assert_eq!(encoded, "\"pen\"");

        let decoded: DeviceKind = serde_json::from_str("\"touch\"").expect("deserialize");
        assert_eq!(decoded, DeviceKind::Touch);
    }
}
