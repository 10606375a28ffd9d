//! Centripetal Catmull-Rom interpolation.
//!
//! Knots are spaced by chord length raised to [`ALPHA`], which keeps the curve
//! free of cusps and self-intersections on sharp turns.

pub const ALPHA: f32 = 0.5;
/// Sub-segments evaluated between the middle two control points.
pub const STEPS: usize = 10;
/// Coincident control points would produce zero-width knot intervals.
const MIN_KNOT_INTERVAL: f32 = 1e-4;

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}
fn lerp2(a: [f32; 2], b: [f32; 2], wa: f32, wb: f32) -> [f32; 2] {
    [a[0] * wa + b[0] * wb, a[1] * wa + b[1] * wb]
}

/// Knot values `t0..=t3`, with `t0 = 0` and `t[i+1] = t[i] + |p[i+1] - p[i]|^ALPHA`.
#[must_use]
pub fn knots(points: &[[f32; 2]; 4]) -> [f32; 4] {
    let mut knots = [0.0; 4];
    for i in 0..3 {
        let interval = distance(points[i], points[i + 1])
            .powf(ALPHA)
            .max(MIN_KNOT_INTERVAL);
        knots[i + 1] = knots[i] + interval;
    }
    knots
}

/// Evaluate the curve at `t`, which should lie within `[t1, t2]`.
#[must_use]
pub fn evaluate(points: &[[f32; 2]; 4], [t0, t1, t2, t3]: [f32; 4], t: f32) -> [f32; 2] {
    let [p0, p1, p2, p3] = *points;
    // Weighted pair `(hi - t) / (hi - lo)`, `(t - lo) / (hi - lo)`
    let weights = |lo: f32, hi: f32| ((hi - t) / (hi - lo), (t - lo) / (hi - lo));

    let (w0, w1) = weights(t0, t1);
    let a1 = lerp2(p0, p1, w0, w1);
    let (w0, w1) = weights(t1, t2);
    let a2 = lerp2(p1, p2, w0, w1);
    let (w0, w1) = weights(t2, t3);
    let a3 = lerp2(p2, p3, w0, w1);

    let (w0, w1) = weights(t0, t2);
    let b1 = lerp2(a1, a2, w0, w1);
    let (w0, w1) = weights(t1, t3);
    let b2 = lerp2(a2, a3, w0, w1);

    let (w0, w1) = weights(t1, t2);
    lerp2(b1, b2, w0, w1)
}

/// Sample the segment between `points[1]` and `points[2]` at `steps + 1` evenly spaced
/// parameter values, endpoints included.
#[must_use]
pub fn middle_segment(points: &[[f32; 2]; 4], steps: usize) -> Vec<[f32; 2]> {
    let knots = knots(points);
    let [_, t1, t2, _] = knots;
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = t1 + (t2 - t1) * (i as f32 / steps as f32);
            evaluate(points, knots, t)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::{knots, middle_segment, STEPS};
    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-3 && (a[1] - b[1]).abs() < 1e-3
    }
    #[test]
    fn knot_spacing() {
        let k = knots(&[[0.0, 0.0], [4.0, 0.0], [4.0, 9.0], [4.0, 9.0]]);
        assert!((k[1] - 2.0).abs() < 1e-5);
        assert!((k[2] - 5.0).abs() < 1e-5);
        // Coincident points still advance.
        assert!(k[3] > k[2]);
    }
    #[test]
    fn passes_through_middle_points() {
        let points = [[0.0, 0.0], [10.0, 5.0], [20.0, -3.0], [25.0, 10.0]];
        let samples = middle_segment(&points, STEPS);
        assert_eq!(samples.len(), STEPS + 1);
        assert!(close(samples[0], points[1]));
        assert!(close(samples[STEPS], points[2]));
    }
    #[test]
    fn collinear_stays_on_line() {
        let points = [[0.0, 0.0], [1.0, 1.0], [3.0, 3.0], [7.0, 7.0]];
        for [x, y] in middle_segment(&points, STEPS) {
            assert!((x - y).abs() < 1e-4);
            assert!((1.0 - 1e-4..=3.0 + 1e-4).contains(&x));
        }
    }
    #[test]
    fn sharp_turn_stays_bounded() {
        // A hairpin. Uniform parameterization would overshoot well past the turn.
        let points = [[0.0, 0.0], [100.0, 0.0], [100.0, 1.0], [0.0, 1.0]];
        for [x, _] in middle_segment(&points, STEPS) {
            assert!(x < 120.0, "overshot to {x}");
        }
    }
}
