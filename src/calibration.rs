//! Running min/max calibration and burst averaging
//!
//! The tracker keeps per-axis bounds that are seeded once from the first
//! completed sample and afterwards only ever widen. Normalization maps each
//! axis from its tracked bounds onto a fixed output range.

use crate::Vector3;
use crate::config::BurstAverage;

/// Number of reads taken per sampling burst
pub const BURST_LEN: usize = 10;

/// Lower end of the normalized output range
pub const NORMALIZED_MIN: f32 = -360.0;

/// Upper end of the normalized output range
pub const NORMALIZED_MAX: f32 = 360.0;

/// Tracked bounds for a single axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisBounds {
    /// Smallest value seen
    pub min: f32,
    /// Largest value seen
    pub max: f32,
}

impl AxisBounds {
    const fn seeded(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    fn expand(&mut self, value: f32) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Width of the tracked interval
    #[must_use]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Tracked bounds for all three axes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationBounds {
    /// X-axis bounds
    pub x: AxisBounds,
    /// Y-axis bounds
    pub y: AxisBounds,
    /// Z-axis bounds
    pub z: AxisBounds,
}

impl CalibrationBounds {
    /// Bounds collapsed onto a single sample (min == max == value)
    #[must_use]
    pub const fn seeded(sample: &Vector3) -> Self {
        Self {
            x: AxisBounds::seeded(sample.x),
            y: AxisBounds::seeded(sample.y),
            z: AxisBounds::seeded(sample.z),
        }
    }

    /// Widen each axis to include `sample`
    pub fn expand(&mut self, sample: &Vector3) {
        self.x.expand(sample.x);
        self.y.expand(sample.y);
        self.z.expand(sample.z);
    }

    /// Map each axis of `sample` from its bounds onto `[out_min, out_max]`
    #[must_use]
    pub fn normalize(&self, sample: &Vector3, out_min: f32, out_max: f32) -> Vector3 {
        Vector3 {
            x: map_range(sample.x, self.x.min, self.x.max, out_min, out_max),
            y: map_range(sample.y, self.y.min, self.y.max, out_min, out_max),
            z: map_range(sample.z, self.z.min, self.z.max, out_min, out_max),
        }
    }
}

/// Linear remap of `x` from `[in_min, in_max]` onto `[out_min, out_max]`
///
/// A zero-width input interval has no slope; the result is then the midpoint
/// of the output range rather than a division by zero.
#[must_use]
pub fn map_range(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span == 0.0 {
        return (out_min + out_max) / 2.0;
    }
    (x - in_min) * (out_max - out_min) / span + out_min
}

/// Lazily seeded min/max tracker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationTracker {
    bounds: Option<CalibrationBounds>,
}

impl CalibrationTracker {
    /// Create an unseeded tracker
    #[must_use]
    pub const fn new() -> Self {
        Self { bounds: None }
    }

    /// Whether the tracker has been seeded since creation or the last reset
    #[must_use]
    pub const fn is_seeded(&self) -> bool {
        self.bounds.is_some()
    }

    /// Current bounds, `None` while unseeded
    #[must_use]
    pub const fn bounds(&self) -> Option<&CalibrationBounds> {
        self.bounds.as_ref()
    }

    /// Collapse the bounds onto `sample`, discarding anything tracked so far
    pub fn seed(&mut self, sample: &Vector3) {
        self.bounds = Some(CalibrationBounds::seeded(sample));
    }

    /// Seed from `sample` only if nothing has been tracked yet
    ///
    /// Returns `true` when this call did the seeding.
    pub fn seed_if_unseeded(&mut self, sample: &Vector3) -> bool {
        if self.bounds.is_some() {
            return false;
        }
        self.seed(sample);
        true
    }

    /// Widen the bounds to include `sample`; no-op while unseeded
    pub fn expand(&mut self, sample: &Vector3) {
        if let Some(bounds) = self.bounds.as_mut() {
            bounds.expand(sample);
        }
    }

    /// Forget all tracked bounds
    pub fn reset(&mut self) {
        self.bounds = None;
    }

    /// Normalize `sample` against the tracked bounds, `None` while unseeded
    #[must_use]
    pub fn normalize(&self, sample: &Vector3, out_min: f32, out_max: f32) -> Option<Vector3> {
        self.bounds
            .as_ref()
            .map(|bounds| bounds.normalize(sample, out_min, out_max))
    }
}

/// Per-axis accumulator for one sampling burst
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Burst {
    sum: Vector3,
}

impl Burst {
    pub(crate) fn add(&mut self, sample: &Vector3) {
        self.sum.x += sample.x;
        self.sum.y += sample.y;
        self.sum.z += sample.z;
    }

    pub(crate) fn average(&self, policy: BurstAverage) -> Vector3 {
        let divisor = policy.divisor();
        Vector3 {
            x: self.sum.x / divisor,
            y: self.sum.y / divisor,
            z: self.sum.z / divisor,
        }
    }
}
