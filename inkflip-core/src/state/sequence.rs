//! # Frame ordering
//!
//! Frames are kept sorted with `frame.index == position`, for positions `0..len`.
//! Every mutation reports which positions had their index rewritten, so the caller
//! knows exactly which records to persist.

use super::frame::{Frame, FrameID};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}
impl FrameSequence {
    /// Order frames as loaded from storage, which may be in any order and have gaps or
    /// duplicate indices after an interrupted write. Frames are sorted by their stored
    /// index (ties broken by id) and re-indexed contiguously.
    ///
    /// Returns the sequence and the positions whose index changed.
    #[must_use]
    pub fn from_unordered(mut frames: Vec<Frame>) -> (Self, Vec<usize>) {
        frames.sort_by_key(|frame| (frame.index, frame.id));
        let mut changed = Vec::new();
        for (position, frame) in frames.iter_mut().enumerate() {
            if frame.index != position {
                frame.index = position;
                changed.push(position);
            }
        }
        (Self { frames }, changed)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }
    #[must_use]
    pub fn position_of(&self, id: FrameID) -> Option<usize> {
        self.frames.iter().position(|frame| frame.id == id)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
    /// Insert at `at` (clamped to the end), shifting successors up by one.
    /// Returns the range of positions whose index was (re)written, including the new frame.
    pub fn insert(&mut self, at: usize, mut frame: Frame) -> std::ops::Range<usize> {
        let at = at.min(self.frames.len());
        frame.index = at;
        self.frames.insert(at, frame);
        self.reindex_from(at);
        at..self.frames.len()
    }
    /// Remove the frame at `at`, shifting successors down by one.
    /// Returns the removed frame and the positions whose index changed.
    pub fn remove(&mut self, at: usize) -> Option<(Frame, std::ops::Range<usize>)> {
        if at >= self.frames.len() {
            return None;
        }
        let removed = self.frames.remove(at);
        self.reindex_from(at);
        Some((removed, at..self.frames.len()))
    }
    fn reindex_from(&mut self, start: usize) {
        for (position, frame) in self.frames.iter_mut().enumerate().skip(start) {
            frame.index = position;
        }
    }
    /// Whether indices are exactly `0..len`, in order.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.frames
            .iter()
            .enumerate()
            .all(|(position, frame)| frame.index == position)
    }
}
/// Panics if out of bounds, like slice indexing.
impl std::ops::Index<usize> for FrameSequence {
    type Output = Frame;
    fn index(&self, index: usize) -> &Frame {
        &self.frames[index]
    }
}
impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
