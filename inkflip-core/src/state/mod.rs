//! # State
//!
//! The frame sequence and the fixed layer roles each frame references.

pub mod frame;
pub mod sequence;

pub use frame::{Frame, FrameID, LayerID, LayerMap, LayerRole};
pub use sequence::FrameSequence;
