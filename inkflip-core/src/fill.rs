//! # Seed fill
//!
//! Exact-match, 4-connected, stack based. Never recurses, so a full canvas region is safe.

use crate::{color::Rgba, raster::Raster};

/// Whether a fill at this seed would change anything.
#[must_use]
pub fn would_fill(surface: &Raster, seed_x: i64, seed_y: i64, color: Rgba) -> bool {
    seed(surface, seed_x, seed_y).is_some_and(|(x, y)| surface.get(x, y) != Some(color.with_alpha(255)))
}

fn seed(surface: &Raster, x: i64, y: i64) -> Option<(u32, u32)> {
    let x = u32::try_from(x).ok()?;
    let y = u32::try_from(y).ok()?;
    surface.index(x, y).map(|_| (x, y))
}

/// Repaint the region 4-connected to the seed and exactly matching its color with
/// `color` at full opacity. Returns the number of pixels painted.
///
/// A seed out of bounds, or already the fill color, paints nothing.
pub fn fill(surface: &mut Raster, seed_x: i64, seed_y: i64, color: Rgba) -> usize {
    let fill = color.with_alpha(255);
    let Some((x, y)) = seed(surface, seed_x, seed_y) else {
        return 0;
    };
    // Checked by `seed`
    let Some(target) = surface.get(x, y) else {
        return 0;
    };
    if target == fill {
        return 0;
    }

    let [width, height] = surface.size();
    let mut painted = 0;
    let mut stack = Vec::with_capacity(1024);
    stack.push((x, y));
    while let Some((x, y)) = stack.pop() {
        let Some(idx) = surface.index(x, y) else {
            continue;
        };
        let pixel = &mut surface.pixels_mut()[idx];
        // Painted pixels no longer match the target, so nothing is visited twice.
        if *pixel != target {
            continue;
        }
        *pixel = fill;
        painted += 1;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }
    log::trace!("Filled {painted} pixels from ({seed_x}, {seed_y}) with {fill}");
    painted
}

/// Parse a fill color given as a `#rrggbb`-style string. Alpha digits are ignored.
/// Unparsable colors abort the fill, so this logs and returns `None`.
pub fn parse_color(color: &str) -> Option<Rgba> {
    match Rgba::parse_opaque(color) {
        Ok(color) => Some(color),
        Err(e) => {
            log::warn!("Not filling with {color:?}: {e}");
            None
        }
    }
}
