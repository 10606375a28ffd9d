use crate::color::Rgba;

/// Porter-Duff operators used by strokes, erasing, compositing and onion tinting.
#[derive(strum::AsRefStr, PartialEq, Eq, strum::EnumIter, Copy, Clone, Hash, Debug, Default)]
#[repr(u8)]
pub enum CompositeOp {
    /// Source painted over the destination.
    #[default]
    SourceOver,
    /// Destination alpha reduced by source alpha. Source color is ignored.
    DestinationOut,
    /// Source painted only where the destination already has coverage,
    /// leaving destination alpha unchanged.
    SourceAtop,
}
impl CompositeOp {
    /// Blend `src`, its alpha scaled by `coverage` in `[0, 1]`, onto `dst`.
    #[must_use]
    pub fn apply(self, dst: Rgba, src: Rgba, coverage: f32) -> Rgba {
        if coverage.is_nan() || coverage <= 0.0 || src.is_transparent() {
            return dst;
        }
        let [sr, sg, sb, sa] = src.to_unit();
        let [dr, dg, db, da] = dst.to_unit();
        let sa = sa * coverage.min(1.0);
        match self {
            Self::SourceOver => {
                let out_a = sa + da * (1.0 - sa);
                if out_a <= 0.0 {
                    return Rgba::TRANSPARENT;
                }
                let mix = |s: f32, d: f32| (s * sa + d * da * (1.0 - sa)) / out_a;
                Rgba::from_unit([mix(sr, dr), mix(sg, dg), mix(sb, db), out_a])
            }
            Self::DestinationOut => {
                let [r, g, b, _] = dst.to_array();
                let a = Rgba::from_unit([0.0, 0.0, 0.0, da * (1.0 - sa)]).alpha();
                Rgba::new(r, g, b, a)
            }
            Self::SourceAtop => {
                if dst.is_transparent() {
                    return dst;
                }
                let mix = |s: f32, d: f32| s * sa + d * (1.0 - sa);
                Rgba::from_unit([mix(sr, dr), mix(sg, dg), mix(sb, db), 1.0]).with_alpha(dst.alpha())
            }
        }
    }
}
