//! A store that keeps everything in-memory. Nothing survives the process.

use super::{decode_frame, encode_frame, LayerStore, StoreError};
use crate::state::{Frame, FrameID, LayerID};

#[derive(Default)]
struct Collections {
    layers: hashbrown::HashMap<LayerID, Vec<u8>>,
    /// Serialized records, so reads go through the same validation as durable stores.
    frames: hashbrown::HashMap<FrameID, String>,
}

/// `None` until initialized.
#[derive(Default)]
pub struct MemoryLayerStore {
    collections: parking_lot::RwLock<Option<Collections>>,
}
impl MemoryLayerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> Result<T, StoreError> {
        self.collections
            .read()
            .as_ref()
            .map(f)
            .ok_or(StoreError::NotInitialized)
    }
    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> Result<T, StoreError> {
        self.collections
            .write()
            .as_mut()
            .map(f)
            .ok_or(StoreError::NotInitialized)
    }
}

#[async_trait::async_trait]
impl LayerStore for MemoryLayerStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        self.collections.write().get_or_insert_with(Collections::default);
        Ok(())
    }
    async fn put_layer(&self, id: LayerID, blob: Vec<u8>) -> Result<(), StoreError> {
        self.write(|c| {
            c.layers.insert(id, blob);
        })
    }
    async fn get_layer(&self, id: LayerID) -> Result<Option<Vec<u8>>, StoreError> {
        self.read(|c| c.layers.get(&id).cloned())
    }
    async fn delete_layer(&self, id: LayerID) -> Result<(), StoreError> {
        self.write(|c| {
            c.layers.remove(&id);
        })
    }
    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        let record = encode_frame(frame)?;
        self.write(|c| {
            c.frames.insert(frame.id, record);
        })
    }
    async fn delete_frame(&self, id: FrameID) -> Result<(), StoreError> {
        self.write(|c| {
            c.frames.remove(&id);
        })
    }
    async fn get_all_frames(&self) -> Result<Vec<Frame>, StoreError> {
        self.read(|c| {
            c.frames
                .iter()
                .map(|(id, record)| decode_frame(&id.to_string(), record))
                .collect::<Result<Vec<_>, _>>()
        })?
    }
}
