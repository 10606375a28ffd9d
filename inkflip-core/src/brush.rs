//! # Brush

use crate::{blend::CompositeOp, color::Rgba};

#[derive(strum::AsRefStr, PartialEq, Eq, strum::EnumIter, Copy, Clone, Hash, Debug, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    /// Seed fill at the pointer-down position. Never enters the stroking state.
    Fill,
    /// Samples are ignored.
    Select,
}

/// Settings of the tool in use, supplied with every pointer sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BrushConfig {
    pub tool: Tool,
    /// Diameter in canvas pixels at full pressure.
    pub size: f32,
    /// Paint color for [`Tool::Brush`] and [`Tool::Fill`].
    pub color: Rgba,
}
impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            size: 8.0,
            color: Rgba::BLACK,
        }
    }
}
impl BrushConfig {
    #[must_use]
    pub fn new(tool: Tool, size: f32, color: Rgba) -> Self {
        Self { tool, size, color }
    }
    /// How stroke coverage lands on the surface.
    #[must_use]
    pub fn composite_op(&self) -> CompositeOp {
        match self.tool {
            Tool::Eraser => CompositeOp::DestinationOut,
            Tool::Brush | Tool::Fill | Tool::Select => CompositeOp::SourceOver,
        }
    }
    /// The color actually laid down. Erasing always removes at full strength,
    /// regardless of the selected color's alpha.
    #[must_use]
    pub fn ink(&self) -> Rgba {
        match self.tool {
            Tool::Eraser => Rgba::BLACK,
            Tool::Brush | Tool::Fill | Tool::Select => self.color,
        }
    }
}
