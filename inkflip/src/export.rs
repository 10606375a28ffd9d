//! Writing composited frames out as image files.

use std::path::{Path, PathBuf};

use inkflip_core::{codec, Editor};

#[must_use]
pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:04}.png"))
}

/// Export each frame of the project in order. With `onion`, each image includes the
/// ghosts of its neighbors exactly as shown while editing.
pub async fn export(editor: &mut Editor, dir: &Path, onion: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    for index in 0..editor.frames().len() {
        let image = if onion {
            editor.select_frame(index).await?;
            editor.render_view().await?.flatten()
        } else {
            editor.render_frame(index).await?
        };
        let path = frame_path(dir, index);
        std::fs::write(&path, codec::encode(&image)?)?;
        log::debug!("wrote {}", path.display());
    }
    log::info!("exported {} frames to {}", editor.frames().len(), dir.display());
    Ok(())
}
