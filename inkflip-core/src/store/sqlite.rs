//! A store backed by a single SQLite database file.
//!
//! `rusqlite` is blocking, so every call hops onto tokio's blocking pool holding the
//! one shared connection.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::OptionalExtension;

use super::{decode_frame, encode_frame, LayerStore, StoreError};
use crate::state::{Frame, FrameID, LayerID};

const SCHEMA: &str = include_str!("../../sql/store.sql");
/// Stamped into `PRAGMA user_version`. Zero means a fresh database.
const SCHEMA_VERSION: i64 = 1;
/// Path that opens a private, non-durable database.
pub const IN_MEMORY: &str = ":memory:";

pub struct SqliteLayerStore {
    path: PathBuf,
    connection: Arc<parking_lot::Mutex<Option<rusqlite::Connection>>>,
}
impl SqliteLayerStore {
    /// Does not touch the filesystem until [`LayerStore::initialize`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connection: Arc::default(),
        }
    }
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
    /// Run `f` against the open connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let lock = connection.lock();
            let connection = lock.as_ref().ok_or(StoreError::NotInitialized)?;
            f(connection)
        })
        .await
        .map_err(|join| StoreError::Join(join.to_string()))?
    }
    fn open(path: &std::path::Path) -> Result<rusqlite::Connection, StoreError> {
        let connection = if path == std::path::Path::new(IN_MEMORY) {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };

        let version: i64 =
            connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
        match version {
            0 => {
                connection.execute_batch(SCHEMA)?;
                connection.pragma_update(None, "user_version", SCHEMA_VERSION)?;
                log::info!("created layer store schema at {}", path.display());
            }
            SCHEMA_VERSION => (),
            newer => return Err(StoreError::UnsupportedSchema(newer)),
        }
        Ok(connection)
    }
}

#[async_trait::async_trait]
impl LayerStore for SqliteLayerStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        let path = self.path.clone();
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut lock = connection.lock();
            if lock.is_none() {
                *lock = Some(Self::open(&path)?);
            }
            Ok(())
        })
        .await
        .map_err(|join| StoreError::Join(join.to_string()))?
    }
    async fn put_layer(&self, id: LayerID, blob: Vec<u8>) -> Result<(), StoreError> {
        self.with_connection(move |c| {
            c.execute(
                "INSERT OR REPLACE INTO layers (id, blob) VALUES (?1, ?2)",
                rusqlite::params![id.to_string(), blob],
            )?;
            Ok(())
        })
        .await
    }
    async fn get_layer(&self, id: LayerID) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_connection(move |c| {
            Ok(c.query_row(
                "SELECT blob FROM layers WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?)
        })
        .await
    }
    async fn delete_layer(&self, id: LayerID) -> Result<(), StoreError> {
        self.with_connection(move |c| {
            c.execute("DELETE FROM layers WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
        .await
    }
    async fn copy_layer(&self, src: LayerID, dst: LayerID) -> Result<bool, StoreError> {
        // Single statement, so unlike the provided version this one is atomic.
        self.with_connection(move |c| {
            let copied = c.execute(
                "INSERT OR REPLACE INTO layers (id, blob) SELECT ?2, blob FROM layers WHERE id = ?1",
                [src.to_string(), dst.to_string()],
            )?;
            Ok(copied != 0)
        })
        .await
    }
    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        let id = frame.id.to_string();
        let record = encode_frame(frame)?;
        self.with_connection(move |c| {
            c.execute(
                "INSERT OR REPLACE INTO frames (id, record) VALUES (?1, ?2)",
                [id, record],
            )?;
            Ok(())
        })
        .await
    }
    async fn delete_frame(&self, id: FrameID) -> Result<(), StoreError> {
        self.with_connection(move |c| {
            c.execute("DELETE FROM frames WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
        .await
    }
    async fn get_all_frames(&self) -> Result<Vec<Frame>, StoreError> {
        self.with_connection(|c| {
            let mut statement = c.prepare("SELECT id, record FROM frames")?;
            let rows = statement.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut frames = Vec::new();
            for row in rows {
                let (id, record) = row?;
                frames.push(decode_frame(&id, &record)?);
            }
            Ok(frames)
        })
        .await
    }
}
