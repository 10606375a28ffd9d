pub mod blend;
pub mod brush;
pub mod cache;
pub mod codec;
pub mod color;
pub mod compositor;
pub mod editor;
pub mod fill;
pub mod history;
pub mod playback;
pub mod raster;
pub mod settings;
pub mod state;
pub mod store;
pub mod stroke;

pub use editor::{Editor, EditorError};
