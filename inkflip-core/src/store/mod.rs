//! # Layer store
//!
//! Durable home of the canonical layer blobs and frame records. Two independent
//! collections, with each operation atomic within its own collection only - there is
//! no cross-collection transaction. A frame record whose layers have no blob reads
//! as empty layers, and a blob no frame references is an unreachable orphan.
//!
//! Calls operate on one key at a time and are not serialized against each other;
//! sequences of calls that must not interleave (snapshot then restore, for
//! instance) are serialized by their owner, see [`crate::editor::Editor`].

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLayerStore;
pub use sqlite::SqliteLayerStore;

use crate::state::{frame::FrameRecordError, Frame, FrameID, LayerID};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store used before initialization")]
    NotInitialized,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("store schema version {0} is newer than supported")]
    UnsupportedSchema(i64),
    #[error("frame record {id} is malformed: {source}")]
    MalformedFrame {
        id: String,
        #[source]
        source: FrameRecordError,
    },
    #[error("storage task failed: {0}")]
    Join(String),
}

#[async_trait::async_trait]
pub trait LayerStore: Send + Sync {
    /// Prepare the store. Every other operation fails with [`StoreError::NotInitialized`] until this succeeds.
    /// Initializing more than once is harmless.
    async fn initialize(&self) -> Result<(), StoreError>;

    async fn put_layer(&self, id: LayerID, blob: Vec<u8>) -> Result<(), StoreError>;
    /// `None` if no blob was ever stored for this id.
    async fn get_layer(&self, id: LayerID) -> Result<Option<Vec<u8>>, StoreError>;
    /// Deleting an absent id is a no-op.
    async fn delete_layer(&self, id: LayerID) -> Result<(), StoreError>;
    /// Copy the blob under `src` to `dst`, a no-op if `src` has none. Returns whether a blob was copied.
    ///
    /// Not atomic as a pair: interrupted after the read, nothing was written; the copy simply didn't happen.
    async fn copy_layer(&self, src: LayerID, dst: LayerID) -> Result<bool, StoreError> {
        match self.get_layer(src).await? {
            Some(blob) => {
                self.put_layer(dst, blob).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError>;
    /// Deleting an absent id is a no-op.
    async fn delete_frame(&self, id: FrameID) -> Result<(), StoreError>;
    /// Every frame record, in no particular order. Records are validated on read.
    async fn get_all_frames(&self) -> Result<Vec<Frame>, StoreError>;
}

fn encode_frame(frame: &Frame) -> Result<String, StoreError> {
    frame.to_record().map_err(|source| StoreError::MalformedFrame {
        id: frame.id.to_string(),
        source,
    })
}
fn decode_frame(id: &str, record: &str) -> Result<Frame, StoreError> {
    Frame::from_record(record).map_err(|source| StoreError::MalformedFrame {
        id: id.to_owned(),
        source,
    })
}
