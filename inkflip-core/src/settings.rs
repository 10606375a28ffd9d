//! User-tunable editor parameters.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct OnionSettings {
    pub enabled: bool,
    /// Overall alpha of each neighbor overlay, in `[0, 1]`.
    pub opacity: f32,
}
impl Default for OnionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: 0.3,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct EditorSettings {
    /// Width and height of every layer raster.
    pub canvas: [u32; 2],
    /// Playback rate, frames per second.
    pub frame_rate: f32,
    /// Undo depth per (frame, layer).
    pub history_capacity: usize,
    /// Decoded layers kept in memory.
    pub cache_capacity: usize,
    /// Last, as it serializes to a table.
    pub onion: OnionSettings,
}
impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            canvas: [1920, 1080],
            frame_rate: 12.0,
            history_capacity: crate::history::DEFAULT_CAPACITY,
            cache_capacity: 32,
            onion: OnionSettings::default(),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("canvas size {0:?} has a zero dimension")]
    EmptyCanvas([u32; 2]),
    #[error("frame rate {0} is not a positive number")]
    FrameRate(f32),
    #[error("onion opacity {0} is outside 0..=1")]
    OnionOpacity(f32),
}

impl EditorSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.canvas.contains(&0) {
            return Err(SettingsError::EmptyCanvas(self.canvas));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(SettingsError::FrameRate(self.frame_rate));
        }
        if !(0.0..=1.0).contains(&self.onion.opacity) {
            return Err(SettingsError::OnionOpacity(self.onion.opacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{EditorSettings, SettingsError};

    #[test]
    fn defaults_are_valid() {
        let settings = EditorSettings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.history_capacity, 20);
    }
    #[test]
    fn rejects() {
        let base = EditorSettings::default();
        let bad = EditorSettings {
            canvas: [0, 10],
            ..base
        };
        assert_eq!(bad.validate(), Err(SettingsError::EmptyCanvas([0, 10])));
        for rate in [0.0, -1.0, f32::INFINITY] {
            let bad = EditorSettings {
                frame_rate: rate,
                ..base
            };
            assert_eq!(bad.validate(), Err(SettingsError::FrameRate(rate)));
        }
        let mut bad = base;
        bad.onion.opacity = 1.5;
        assert_eq!(bad.validate(), Err(SettingsError::OnionOpacity(1.5)));
        bad.onion.opacity = f32::NAN;
        assert!(bad.validate().is_err());
    }
}
