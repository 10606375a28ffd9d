//! # Frames
//!
//! Frame and layer identifiers are random UUIDs, stable on disk. Unlike in-process ids,
//! these are persisted and rendered as strings in the store.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameID(uuid::Uuid);
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerID(uuid::Uuid);

macro_rules! persistent_id {
    ($ty:ident) => {
        impl $ty {
            /// Generate a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_hyphenated())
            }
        }
        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.0.as_hyphenated())
            }
        }
        impl std::str::FromStr for $ty {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}
persistent_id!(FrameID);
persistent_id!(LayerID);

/// The fixed roles of a frame's three layers.
#[derive(
    strum::AsRefStr, strum::EnumIter, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug,
)]
#[repr(u8)]
pub enum LayerRole {
    Background,
    Lineart,
    Color,
}
impl LayerRole {
    pub const ALL: [Self; 3] = [Self::Background, Self::Lineart, Self::Color];
    /// Bottom-to-top draw order. Lineart stays readable above the color beneath it.
    pub const COMPOSITE_ORDER: [Self; 3] = [Self::Background, Self::Color, Self::Lineart];
    const fn index(self) -> usize {
        self as usize
    }
}

/// Exactly one `T` per [`LayerRole`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct LayerMap<T>([T; 3]);
impl<T> LayerMap<T> {
    #[must_use]
    pub fn new(background: T, lineart: T, color: T) -> Self {
        Self([background, lineart, color])
    }
    pub fn from_fn(mut f: impl FnMut(LayerRole) -> T) -> Self {
        Self(LayerRole::ALL.map(&mut f))
    }
    /// Iterate in [`LayerRole::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerRole, &T)> + '_ {
        LayerRole::ALL.into_iter().zip(self.0.iter())
    }
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> LayerMap<U> {
        LayerMap(self.0.map(f))
    }
}
impl<T> std::ops::Index<LayerRole> for LayerMap<T> {
    type Output = T;
    fn index(&self, role: LayerRole) -> &T {
        &self.0[role.index()]
    }
}
impl<T> std::ops::IndexMut<LayerRole> for LayerMap<T> {
    fn index_mut(&mut self, role: LayerRole) -> &mut T {
        &mut self.0[role.index()]
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub id: FrameID,
    /// Position in the sequence. Owned by [`super::FrameSequence`], which keeps these gap-free.
    pub index: usize,
    pub layers: LayerMap<LayerID>,
}
impl Frame {
    /// A frame with freshly generated ids. None of its layers have stored pixels yet.
    #[must_use]
    pub fn new_empty(index: usize) -> Self {
        Self {
            id: FrameID::generate(),
            index,
            layers: LayerMap::from_fn(|_| LayerID::generate()),
        }
    }
    #[must_use]
    pub fn layer(&self, role: LayerRole) -> LayerID {
        self.layers[role]
    }
}

/// Record layout version written by this build.
pub const RECORD_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum FrameRecordError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unsupported frame record version {0}")]
    UnsupportedVersion(u32),
    #[error("layer {0} referenced more than once")]
    DuplicateLayer(LayerID),
    #[error("frame index {0} out of range")]
    Index(u64),
}

/// Persisted shape of a [`Frame`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameRecord {
    version: u32,
    id: FrameID,
    index: u64,
    layers: LayerRecord,
}
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayerRecord {
    background: LayerID,
    lineart: LayerID,
    color: LayerID,
}

impl Frame {
    /// Serialize into the versioned record format.
    /// # Errors
    /// Errs are forwarded from `serde_json`.
    pub fn to_record(&self) -> Result<String, FrameRecordError> {
        let record = FrameRecord {
            version: RECORD_VERSION,
            id: self.id,
            index: self.index as u64,
            layers: LayerRecord {
                background: self.layers[LayerRole::Background],
                lineart: self.layers[LayerRole::Lineart],
                color: self.layers[LayerRole::Color],
            },
        };
        Ok(serde_json::to_string(&record)?)
    }
    /// Parse and validate a record. The record shape must match exactly and every
    /// layer id must be distinct.
    /// # Errors
    /// See [`FrameRecordError`].
    pub fn from_record(text: &str) -> Result<Self, FrameRecordError> {
        let record: FrameRecord = serde_json::from_str(text)?;
        if record.version != RECORD_VERSION {
            return Err(FrameRecordError::UnsupportedVersion(record.version));
        }
        let index = usize::try_from(record.index).map_err(|_| FrameRecordError::Index(record.index))?;
        let LayerRecord {
            background,
            lineart,
            color,
        } = record.layers;
        if lineart == background {
            return Err(FrameRecordError::DuplicateLayer(lineart));
        }
        if color == background || color == lineart {
            return Err(FrameRecordError::DuplicateLayer(color));
        }
        Ok(Self {
            id: record.id,
            index,
            layers: LayerMap::new(background, lineart, color),
        })
    }
}
