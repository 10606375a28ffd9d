use super::{spline, StrokeSample};
use crate::{
    blend::CompositeOp,
    brush::{BrushConfig, Tool},
    color::Rgba,
    raster::Raster,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StrokeState {
    Idle,
    Stroking,
}

/// What a pointer-down turned into.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StartOutcome {
    Stroking,
    /// The fill tool ran to completion, painting this many pixels.
    Filled(usize),
    Ignored,
}

/// Turns pointer samples into painted pixels on a live surface.
#[derive(Default)]
pub struct StrokeRasterizer {
    /// Samples of the stroke in progress. Non-empty iff stroking.
    samples: Vec<StrokeSample>,
}
impl StrokeRasterizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn state(&self) -> StrokeState {
        if self.samples.is_empty() {
            StrokeState::Idle
        } else {
            StrokeState::Stroking
        }
    }
    #[must_use]
    pub fn samples(&self) -> &[StrokeSample] {
        &self.samples
    }
    pub fn start_stroke(
        &mut self,
        sample: StrokeSample,
        brush: &BrushConfig,
        surface: &mut Raster,
    ) -> StartOutcome {
        // A stroke that never saw its pointer-up is abandoned as-is.
        self.samples.clear();
        let Some(sample) = sample.sanitized() else {
            log::warn!("Dropping non-finite stroke sample {sample:?}");
            return StartOutcome::Ignored;
        };
        match brush.tool {
            Tool::Fill => {
                let [x, y] = sample.pos.map(|v| v.floor() as i64);
                StartOutcome::Filled(crate::fill::fill(surface, x, y, brush.color))
            }
            Tool::Select => StartOutcome::Ignored,
            Tool::Brush | Tool::Eraser => {
                self.samples.push(sample);
                StartOutcome::Stroking
            }
        }
    }
    /// Append a sample and draw its contribution. Returns `true` if anything was drawn.
    pub fn add_sample(
        &mut self,
        sample: StrokeSample,
        brush: &BrushConfig,
        surface: &mut Raster,
    ) -> bool {
        if self.state() == StrokeState::Idle || matches!(brush.tool, Tool::Select | Tool::Fill) {
            return false;
        }
        let Some(sample) = sample.sanitized() else {
            log::warn!("Dropping non-finite stroke sample {sample:?}");
            return false;
        };
        self.samples.push(sample);
        log::trace!("Stroke sample #{}: {sample:?}", self.samples.len());
        self.draw_latest(brush, surface)
    }
    /// Leave the stroking state, returning the number of samples the stroke had.
    pub fn end_stroke(&mut self) -> usize {
        let len = self.samples.len();
        self.samples.clear();
        len
    }
    fn draw_latest(&self, brush: &BrushConfig, surface: &mut Raster) -> bool {
        let op = brush.composite_op();
        let ink = brush.ink();
        match self.samples.as_slice() {
            [] | [_] => false,
            // Not enough history for a spline yet: straight segment between the latest two.
            [a, b] | [_, a, b] => {
                draw_segment(surface, a.pos, b.pos, brush.size * b.pressure, ink, op)
            }
            [.., p0, p1, p2, p3] => {
                let control = [p0.pos, p1.pos, p2.pos, p3.pos];
                let points = spline::middle_segment(&control, spline::STEPS);
                let mut drew = false;
                for (i, pair) in points.windows(2).enumerate() {
                    let t = i as f32 / spline::STEPS as f32;
                    let pressure = p1.pressure + (p2.pressure - p1.pressure) * t;
                    drew |= draw_segment(surface, pair[0], pair[1], brush.size * pressure, ink, op);
                }
                drew
            }
        }
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (ap[0] - ab[0] * t).hypot(ap[1] - ab[1] * t)
}

/// Draw an anti-aliased, round-capped segment of the given width.
/// Returns `true` if any pixel was touched.
pub fn draw_segment(
    surface: &mut Raster,
    a: [f32; 2],
    b: [f32; 2],
    width: f32,
    color: Rgba,
    op: CompositeOp,
) -> bool {
    if width.is_nan() || width <= 0.0 {
        return false;
    }
    let radius = width / 2.0;
    // Hairlines narrower than a pixel fade instead of thinning.
    let strength = width.min(1.0);

    let pad = radius + 1.0;
    let min_x = (a[0].min(b[0]) - pad).floor().max(0.0);
    let min_y = (a[1].min(b[1]) - pad).floor().max(0.0);
    let max_x = (a[0].max(b[0]) + pad).ceil().min(surface.width() as f32);
    let max_y = (a[1].max(b[1]) + pad).ceil().min(surface.height() as f32);
    if min_x >= max_x || min_y >= max_y {
        return false;
    }

    let mut touched = false;
    for y in min_y as u32..max_y as u32 {
        for x in min_x as u32..max_x as u32 {
            let center = [x as f32 + 0.5, y as f32 + 0.5];
            let coverage = (radius + 0.5 - segment_distance(center, a, b)).clamp(0.0, 1.0) * strength;
            if coverage <= 0.0 {
                continue;
            }
            if let Some(idx) = surface.index(x, y) {
                let pixel = &mut surface.pixels_mut()[idx];
                *pixel = op.apply(*pixel, color, coverage);
                touched = true;
            }
        }
    }
    touched
}
