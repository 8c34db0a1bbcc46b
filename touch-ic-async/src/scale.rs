//! Mapping from sensor coordinates to display coordinates.

use crate::profile::Resolution;
use crate::report::TouchPoint;

/// Linear scaling of one axis from `0..=raw_max` onto `0..=target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisScale {
    /// Largest coordinate the sensor reports.
    pub raw_max: u16,
    /// Largest coordinate of the display.
    pub target: u16,
}

impl AxisScale {
    /// Creates an axis scale.
    pub const fn new(raw_max: u16, target: u16) -> Self {
        Self { raw_max, target }
    }

    /// Scales `raw`, clamping to `target`. An unknown sensor range (0) passes
    /// the value through unchanged.
    pub fn apply(&self, raw: u16) -> u16 {
        if self.raw_max == 0 {
            return raw;
        }
        let scaled = raw as u32 * self.target as u32 / self.raw_max as u32;
        scaled.min(self.target as u32) as u16
    }
}

/// Per-axis scaling of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaling {
    pub x: AxisScale,
    pub y: AxisScale,
}

impl Scaling {
    /// Scaling from the sensor resolution onto the display resolution.
    pub fn new(sensor: Resolution, display: Resolution) -> Self {
        Self {
            x: AxisScale::new(sensor.x, display.x),
            y: AxisScale::new(sensor.y, display.y),
        }
    }

    /// Scales both coordinates of `point`.
    pub fn apply(&self, point: &mut TouchPoint) {
        point.x = self.x.apply(point.x);
        point.y = self.y.apply(point.y);
    }
}

/// Axis swap and mirroring, for panels mounted rotated.
///
/// Swapping happens first; mirroring then works on the swapped axes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub swap_xy: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

impl Transform {
    /// No change.
    pub const IDENTITY: Transform = Transform {
        swap_xy: false,
        mirror_x: false,
        mirror_y: false,
    };

    /// Applies the transform. `bounds` is the coordinate range before any
    /// swap; mirroring is skipped when it is unknown.
    pub fn apply(&self, point: &mut TouchPoint, bounds: Option<Resolution>) {
        let mut bounds = bounds;
        if self.swap_xy {
            core::mem::swap(&mut point.x, &mut point.y);
            bounds = bounds.map(|b| Resolution::new(b.y, b.x));
        }
        let Some(bounds) = bounds else {
            return;
        };
        if self.mirror_x {
            point.x = bounds.x.saturating_sub(point.x);
        }
        if self.mirror_y {
            point.y = bounds.y.saturating_sub(point.y);
        }
    }
}
