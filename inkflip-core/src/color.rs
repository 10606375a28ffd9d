//! # Color
//!
//! Layer rasters are stored and compared as straight (non-premultiplied) 8-bit sRGB.

/// A straight-alpha RGBA8 color.
/// All transparent values (alpha == 0) are normalized to transparent black.
// Because of the normalization invariant, this is not Pod.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::NoUninit, bytemuck::Zeroable, Debug, Default)]
pub struct Rgba([u8; 4]);
impl Rgba {
    pub const TRANSPARENT: Self = Self([0; 4]);
    pub const WHITE: Self = Self([255; 4]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Create a new color. Normalizes all fully transparent colors to `[0; 4]`.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        if a == 0 {
            Self::TRANSPARENT
        } else {
            Self([r, g, b, a])
        }
    }
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
    #[must_use]
    pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        self.0
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.0[3] == 0
    }
    /// Replace the alpha channel, keeping rgb.
    #[must_use = "returns a new color without modifying `self`"]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.0[0], self.0[1], self.0[2], a)
    }
    /// Channels as `[0, 1]` floats.
    #[must_use]
    pub fn to_unit(self) -> [f32; 4] {
        self.0.map(|c| f32::from(c) / 255.0)
    }
    /// Quantize `[0, 1]` floats, clamping anything out of range.
    #[must_use]
    pub fn from_unit(rgba: [f32; 4]) -> Self {
        let [r, g, b, a] = rgba.map(quantize);
        Self::new(r, g, b, a)
    }
}

fn quantize(value: f32) -> u8 {
    // NaN clamps to NaN, which `as` saturates to 0.
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color must start with `#`")]
    MissingHash,
    #[error("expected 3, 6, or 8 hex digits, found {0}")]
    Length(usize),
    #[error("invalid hex digit {0:?}")]
    Digit(char),
}

/// Straight `[r, g, b, a]` channels of `#rgb`, `#rrggbb`, or `#rrggbbaa`, case insensitive.
fn parse_channels(s: &str) -> Result<[u8; 4], ColorParseError> {
    let digits = s.trim().strip_prefix('#').ok_or(ColorParseError::MissingHash)?;
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorParseError::Digit(bad));
    }
    // All ascii from here on, so byte indexing is char indexing.
    let nibble = |idx: usize| -> u8 {
        char::from(digits.as_bytes()[idx])
            .to_digit(16)
            .map_or(0, |digit| digit as u8)
    };
    let byte = |idx: usize| nibble(idx * 2) << 4 | nibble(idx * 2 + 1);
    match digits.len() {
        3 => Ok([nibble(0) * 17, nibble(1) * 17, nibble(2) * 17, 255]),
        6 => Ok([byte(0), byte(1), byte(2), 255]),
        8 => Ok([byte(0), byte(1), byte(2), byte(3)]),
        other => Err(ColorParseError::Length(other)),
    }
}
impl Rgba {
    /// Parse as [`FromStr`](std::str::FromStr) does, then discard any alpha digits.
    /// Keeps the color of `#rrggbb00`, which would otherwise collapse to transparent black.
    pub fn parse_opaque(s: &str) -> Result<Self, ColorParseError> {
        let [r, g, b, _] = parse_channels(s)?;
        Ok(Self::opaque(r, g, b))
    }
}
impl std::str::FromStr for Rgba {
    type Err = ColorParseError;
    /// Parses `#rgb`, `#rrggbb`, or `#rrggbbaa`, case insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_channels(s).map(Self::from_array)
    }
}
impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}
