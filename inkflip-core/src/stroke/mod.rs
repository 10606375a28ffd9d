//! # Strokes
//!
//! Pointer samples and their conversion into painted pixels.

pub mod rasterizer;
pub mod spline;

pub use rasterizer::{StartOutcome, StrokeRasterizer, StrokeState};

/// Timestamps of pointer samples, from an arbitrary host-defined epoch.
#[derive(bytemuck::Pod, bytemuck::Zeroable, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
#[repr(transparent)]
pub struct Microseconds(pub u64);

/// A single pointer sample, in canvas space.
///
/// Exists only for the span of one pointer-down to pointer-up interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeSample {
    pub pos: [f32; 2],
    /// `[0, 1]`
    pub pressure: f32,
    pub tilt: [f32; 2],
    pub time: Microseconds,
}
impl StrokeSample {
    #[must_use]
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            pos: [x, y],
            pressure,
            tilt: [0.0; 2],
            time: Microseconds::default(),
        }
    }
    #[must_use = "returns a new sample without modifying `self`"]
    pub fn at(self, time: Microseconds) -> Self {
        Self { time, ..self }
    }
    /// Clamp pressure into range, or `None` if any coordinate is not finite.
    #[must_use]
    pub fn sanitized(self) -> Option<Self> {
        let finite = self.pos.iter().chain(&self.tilt).all(|v| v.is_finite());
        if !finite || self.pressure.is_nan() {
            return None;
        }
        Some(Self {
            pressure: self.pressure.clamp(0.0, 1.0),
            ..self
        })
    }
}
