//! # Editor
//!
//! The editing surface consumed by a host: frame CRUD, the stroke lifecycle, fill,
//! undo/redo and playback controls.
//!
//! Every operation takes `&mut self`, so all store traffic issued through an editor is
//! serialized. A snapshot and the restore that follows it can never interleave with
//! another write to the same layer.
//!
//! The active layer is edited on a live in-memory surface which is written to the
//! store when a stroke ends. Any operation that leaves the active (frame, layer)
//! pair first commits the stroke in progress.

use std::sync::Arc;

use crate::{
    blend::CompositeOp,
    brush::{BrushConfig, Tool},
    cache::RasterCache,
    codec::{self, CodecError},
    compositor::{CompositeRenderer, OnionSkin, Presenter, Ticket},
    fill,
    history::{Direction, Snapshot, UndoHistory},
    playback::{Clock, PlaybackError, PlaybackScheduler, SystemClock},
    raster::Raster,
    settings::{EditorSettings, SettingsError},
    state::{Frame, FrameSequence, LayerID, LayerRole},
    store::{LayerStore, StoreError},
    stroke::{StartOutcome, StrokeRasterizer, StrokeSample, StrokeState},
};

#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("cannot delete the only frame")]
    LastFrame,
    #[error("no frame at index {0}")]
    NoSuchFrame(usize),
}

/// A frame ready for display, with its onion skin under and over it.
#[derive(Clone, Debug)]
pub struct View {
    pub previous: Option<Raster>,
    pub frame: Raster,
    pub next: Option<Raster>,
}
impl View {
    /// Composite the overlays in display order into one raster.
    #[must_use]
    pub fn flatten(&self) -> Raster {
        let mut out = Raster::with_size(self.frame.size());
        let layers = [self.previous.as_ref(), Some(&self.frame), self.next.as_ref()];
        for layer in layers.into_iter().flatten() {
            out.draw(layer, CompositeOp::SourceOver, 1.0);
        }
        out
    }
}

pub struct Editor<C: Clock = SystemClock> {
    store: Arc<dyn LayerStore>,
    cache: Arc<parking_lot::Mutex<RasterCache>>,
    compositor: CompositeRenderer,
    presenter: Presenter,
    settings: EditorSettings,
    frames: FrameSequence,
    /// Index into `frames`, always in bounds.
    active: usize,
    role: LayerRole,
    /// Working copy of the active layer.
    surface: Raster,
    rasterizer: StrokeRasterizer,
    history: UndoHistory,
    playback: PlaybackScheduler<C>,
}

impl Editor<SystemClock> {
    /// Open the project in `store`, playing back on the wall clock.
    pub async fn open(
        store: Arc<dyn LayerStore>,
        settings: EditorSettings,
    ) -> Result<Self, EditorError> {
        Self::open_with_clock(store, settings, SystemClock).await
    }
}

impl<C: Clock> Editor<C> {
    /// Initialize `store` and load its frames, repairing their order if needed.
    /// An empty store gets a single empty frame.
    pub async fn open_with_clock(
        store: Arc<dyn LayerStore>,
        settings: EditorSettings,
        clock: C,
    ) -> Result<Self, EditorError> {
        settings.validate()?;
        let playback = PlaybackScheduler::new(clock, settings.frame_rate)?;
        store.initialize().await?;

        let stored = store.get_all_frames().await?;
        let frames = if stored.is_empty() {
            let frame = Frame::new_empty(0);
            store.put_frame(&frame).await?;
            log::info!("new project, created frame {}", frame.id);
            FrameSequence::from_unordered(vec![frame]).0
        } else {
            let (frames, changed) = FrameSequence::from_unordered(stored);
            if !changed.is_empty() {
                log::warn!(
                    "frame indices were not contiguous, renumbering {} frames",
                    changed.len()
                );
                for position in changed {
                    store.put_frame(&frames[position]).await?;
                }
            }
            frames
        };

        let cache = Arc::new(parking_lot::Mutex::new(RasterCache::new(
            settings.cache_capacity,
        )));
        let compositor = CompositeRenderer::new(store.clone(), cache.clone(), settings.canvas);
        let mut this = Self {
            store,
            cache,
            compositor,
            presenter: Presenter::new(),
            settings,
            frames,
            active: 0,
            role: LayerRole::Lineart,
            surface: Raster::with_size(settings.canvas),
            rasterizer: StrokeRasterizer::new(),
            history: UndoHistory::new(settings.history_capacity),
            playback,
        };
        this.history.rescope(this.frames[0].id, this.role);
        this.load_surface().await?;
        log::info!("opened project with {} frames", this.frames.len());
        Ok(this)
    }

    #[must_use]
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }
    #[must_use]
    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }
    #[must_use]
    pub fn active_frame(&self) -> &Frame {
        &self.frames[self.active]
    }
    #[must_use]
    pub fn active_role(&self) -> LayerRole {
        self.role
    }
    /// The live contents of the active layer, including any stroke in progress.
    #[must_use]
    pub fn surface(&self) -> &Raster {
        &self.surface
    }
    #[must_use]
    pub fn stroke_state(&self) -> StrokeState {
        self.rasterizer.state()
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
    /// A renderer sharing this editor's store and cache, for composites issued elsewhere.
    /// Pair its results with a [`Editor::ticket`] to drop ones that arrive too late.
    #[must_use]
    pub fn compositor(&self) -> CompositeRenderer {
        self.compositor.clone()
    }
    #[must_use]
    pub fn presenter(&self) -> Presenter {
        self.presenter.clone()
    }
    /// Ticket for a composite of the active frame, invalidated by the next frame switch.
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.presenter.ticket(self.active_frame().id)
    }

    fn active_layer(&self) -> LayerID {
        self.active_frame().layer(self.role)
    }
    /// Replace the surface with the stored contents of the active layer.
    async fn load_surface(&mut self) -> Result<(), StoreError> {
        let id = self.active_layer();
        self.surface = match self.compositor.resolve_layer(id).await? {
            Some(raster) => Raster::clone(&raster),
            None => Raster::with_size(self.settings.canvas),
        };
        Ok(())
    }
    /// Write the surface to the store, dropping any now-stale decode.
    async fn save_surface(&mut self) -> Result<(), EditorError> {
        let id = self.active_layer();
        let blob = codec::encode(&self.surface)?;
        self.store.put_layer(id, blob).await?;
        self.cache.lock().invalidate(id);
        Ok(())
    }
    async fn persist(&self, positions: std::ops::Range<usize>) -> Result<(), StoreError> {
        for frame in self.frames.iter().take(positions.end).skip(positions.start) {
            self.store.put_frame(frame).await?;
        }
        Ok(())
    }
    /// End and save the stroke in progress, if any.
    async fn commit_stroke(&mut self) -> Result<(), EditorError> {
        if self.rasterizer.state() == StrokeState::Stroking {
            let samples = self.rasterizer.end_stroke();
            log::trace!("committing stroke of {samples} samples");
            self.save_surface().await?;
        }
        Ok(())
    }
    /// Make (`index`, `role`) active. Clears history if the pair changed.
    async fn switch_to(&mut self, index: usize, role: LayerRole) -> Result<(), EditorError> {
        self.commit_stroke().await?;
        self.active = index;
        self.role = role;
        if self.history.rescope(self.active_frame().id, role) {
            log::debug!("history discarded on switch to frame {index}, {role:?}");
        }
        self.presenter.advance();
        self.load_surface().await?;
        Ok(())
    }
    /// Snapshot the stored state of the active layer before it changes.
    async fn begin_mutation(&mut self) -> Result<(), EditorError> {
        let before = self.store.get_layer(self.active_layer()).await?;
        self.history.record(Snapshot::from(before));
        Ok(())
    }

    /// Insert an empty frame right after the active one, and select it.
    pub async fn add_frame(&mut self) -> Result<usize, EditorError> {
        self.commit_stroke().await?;
        let at = self.active + 1;
        let written = self.frames.insert(at, Frame::new_empty(at));
        self.persist(written).await?;
        self.switch_to(at, self.role).await?;
        self.follow_selection();
        Ok(at)
    }
    /// Copy the frame at `index`, blobs included, to `index + 1`. The selection stays on the same frame.
    pub async fn duplicate_frame(&mut self, index: usize) -> Result<usize, EditorError> {
        let source = *self.frames.get(index).ok_or(EditorError::NoSuchFrame(index))?;
        self.commit_stroke().await?;

        let copy = Frame::new_empty(index + 1);
        for role in LayerRole::ALL {
            self.store
                .copy_layer(source.layer(role), copy.layer(role))
                .await?;
        }
        let written = self.frames.insert(index + 1, copy);
        self.persist(written).await?;
        if self.active > index {
            self.active += 1;
        }
        self.follow_selection();
        log::debug!("duplicated frame {index} as {}", copy.id);
        Ok(index + 1)
    }
    /// Delete the frame at `index` along with its layers. The last frame cannot be deleted.
    pub async fn delete_frame(&mut self, index: usize) -> Result<(), EditorError> {
        if index >= self.frames.len() {
            return Err(EditorError::NoSuchFrame(index));
        }
        if self.frames.len() == 1 {
            return Err(EditorError::LastFrame);
        }
        self.commit_stroke().await?;

        let doomed = self.frames[index];
        self.store.delete_frame(doomed.id).await?;
        for (_, &layer) in doomed.layers.iter() {
            self.store.delete_layer(layer).await?;
            self.cache.lock().invalidate(layer);
        }
        let Some((_, written)) = self.frames.remove(index) else {
            return Err(EditorError::NoSuchFrame(index));
        };
        self.persist(written).await?;

        match self.active.cmp(&index) {
            std::cmp::Ordering::Equal => {
                let nearest = index.min(self.frames.len() - 1);
                self.switch_to(nearest, self.role).await?;
            }
            std::cmp::Ordering::Greater => self.active -= 1,
            std::cmp::Ordering::Less => (),
        }
        self.follow_selection();
        Ok(())
    }
    pub async fn select_frame(&mut self, index: usize) -> Result<(), EditorError> {
        if index >= self.frames.len() {
            return Err(EditorError::NoSuchFrame(index));
        }
        self.switch_to(index, self.role).await?;
        self.follow_selection();
        Ok(())
    }
    /// Playback continues from the active frame after the sequence or selection is edited under it.
    fn follow_selection(&mut self) {
        if self.playback.is_playing() && self.playback.current() != self.active {
            log::debug!("playback moved to frame {}", self.active);
            self.playback.start(self.active);
        }
    }
    pub async fn select_layer(&mut self, role: LayerRole) -> Result<(), EditorError> {
        self.switch_to(self.active, role).await
    }

    /// Pointer down. Ignored while playing.
    ///
    /// The pre-edit snapshot is fetched before anything is drawn, so it always
    /// reflects the true state before this stroke or fill.
    pub async fn start_stroke(
        &mut self,
        sample: StrokeSample,
        brush: &BrushConfig,
    ) -> Result<StartOutcome, EditorError> {
        if self.playback.is_playing() {
            log::debug!("ignoring pointer down during playback");
            return Ok(StartOutcome::Ignored);
        }
        self.commit_stroke().await?;

        let mutates = match (brush.tool, sample.sanitized()) {
            (_, None) | (Tool::Select, _) => false,
            (Tool::Fill, Some(sample)) => {
                let [x, y] = sample.pos.map(|v| v.floor() as i64);
                fill::would_fill(&self.surface, x, y, brush.color)
            }
            (Tool::Brush | Tool::Eraser, Some(_)) => true,
        };
        if mutates {
            self.begin_mutation().await?;
        }
        let outcome = self
            .rasterizer
            .start_stroke(sample, brush, &mut self.surface);
        if matches!(outcome, StartOutcome::Filled(_)) && mutates {
            self.save_surface().await?;
        }
        Ok(outcome)
    }
    /// Pointer motion. Returns whether anything was drawn.
    pub fn add_sample(&mut self, sample: StrokeSample, brush: &BrushConfig) -> bool {
        if self.playback.is_playing() {
            return false;
        }
        self.rasterizer.add_sample(sample, brush, &mut self.surface)
    }
    /// Pointer up. Saves the stroke.
    pub async fn end_stroke(&mut self) -> Result<(), EditorError> {
        self.commit_stroke().await
    }
    /// Seed fill of the active layer. An unparsable color, or a fill that would
    /// change nothing, is a no-op returning `false`.
    pub async fn fill(&mut self, x: i64, y: i64, color: &str) -> Result<bool, EditorError> {
        if self.playback.is_playing() {
            return Ok(false);
        }
        let Some(color) = fill::parse_color(color) else {
            return Ok(false);
        };
        self.commit_stroke().await?;
        if !fill::would_fill(&self.surface, x, y, color) {
            return Ok(false);
        }
        self.begin_mutation().await?;
        fill::fill(&mut self.surface, x, y, color);
        self.save_surface().await?;
        Ok(true)
    }

    /// Restore the previous state of the active layer.
    /// Returns the re-rendered active frame, or `None` if there was nothing to undo.
    pub async fn undo(&mut self) -> Result<Option<Raster>, EditorError> {
        self.restore(Direction::Undo).await
    }
    /// Mirror of [`Editor::undo`].
    pub async fn redo(&mut self) -> Result<Option<Raster>, EditorError> {
        self.restore(Direction::Redo).await
    }
    async fn restore(&mut self, direction: Direction) -> Result<Option<Raster>, EditorError> {
        self.commit_stroke().await?;
        let id = self.active_layer();
        let current = Snapshot::from(self.store.get_layer(id).await?);
        let Some(snapshot) = self.history.take(direction, current) else {
            return Ok(None);
        };
        match snapshot {
            Snapshot::Blob(blob) => self.store.put_layer(id, blob).await?,
            Snapshot::Absent => self.store.delete_layer(id).await?,
        }
        self.cache.lock().invalidate(id);
        self.load_surface().await?;
        self.presenter.advance();
        log::debug!("{direction:?} on layer {id}");
        Ok(Some(self.render_frame(self.active).await?))
    }

    /// Composite of the frame at `index`. The active frame shows its live surface.
    pub async fn render_frame(&self, index: usize) -> Result<Raster, EditorError> {
        let frame = self.frames.get(index).ok_or(EditorError::NoSuchFrame(index))?;
        let live = (index == self.active).then_some((self.role, &self.surface));
        Ok(self.compositor.render_frame_with(frame, live).await?)
    }
    /// Ghosts of the neighbors of `index`, empty while playing.
    pub async fn render_onion_skin(&self, index: usize) -> Result<OnionSkin, EditorError> {
        Ok(self
            .compositor
            .render_onion_skin(
                &self.frames,
                index,
                &self.settings.onion,
                self.playback.is_playing(),
            )
            .await?)
    }
    /// Everything to display for the active frame.
    pub async fn render_view(&self) -> Result<View, EditorError> {
        let frame = self.render_frame(self.active).await?;
        let OnionSkin { previous, next } = self.render_onion_skin(self.active).await?;
        Ok(View {
            previous,
            frame,
            next,
        })
    }

    /// Start playback from the active frame.
    pub async fn play(&mut self) -> Result<(), EditorError> {
        self.commit_stroke().await?;
        self.playback.start(self.active);
        Ok(())
    }
    pub fn stop(&mut self) {
        self.playback.stop();
    }
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }
    pub fn set_rate(&mut self, rate: f32) -> Result<(), EditorError> {
        self.playback.set_rate(rate)?;
        self.settings.frame_rate = rate;
        Ok(())
    }
    /// Poll playback, switching frames if one is due.
    /// Returns the index of the newly active frame.
    pub async fn tick(&mut self) -> Result<Option<usize>, EditorError> {
        let Some(index) = self.playback.tick(self.frames.len()) else {
            return Ok(None);
        };
        self.switch_to(index, self.role).await?;
        log::trace!("playback at frame {index}");
        Ok(Some(index))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{Editor, EditorError};
    use crate::{
        brush::{BrushConfig, Tool},
        codec,
        color::Rgba,
        playback::ManualClock,
        raster::Raster,
        settings::EditorSettings,
        state::{Frame, FrameID, LayerID, LayerRole},
        store::{LayerStore, MemoryLayerStore, SqliteLayerStore, StoreError},
        stroke::{StartOutcome, StrokeSample},
    };
    use tokio::sync::oneshot;

    fn settings() -> EditorSettings {
        EditorSettings {
            canvas: [32, 32],
            frame_rate: 10.0,
            ..EditorSettings::default()
        }
    }
    async fn editor() -> (Arc<MemoryLayerStore>, Editor<ManualClock>, ManualClock) {
        let store = Arc::new(MemoryLayerStore::new());
        let clock = ManualClock::new();
        let editor = Editor::open_with_clock(store.clone(), settings(), clock.clone())
            .await
            .unwrap();
        (store, editor, clock)
    }
    fn brush(color: Rgba) -> BrushConfig {
        BrushConfig::new(Tool::Brush, 3.0, color)
    }
    /// A zigzag across the canvas, offset by `shift`.
    async fn scribble(editor: &mut Editor<ManualClock>, brush: &BrushConfig, shift: f32) {
        let points = [[2.0, 2.0], [28.0, 6.0], [4.0, 14.0], [26.0, 20.0], [6.0, 28.0]];
        let mut points = points.iter().map(|&[x, y]| StrokeSample::new(x + shift, y, 1.0));
        let first = points.next().unwrap();
        assert_eq!(
            editor.start_stroke(first, brush).await.unwrap(),
            StartOutcome::Stroking
        );
        for sample in points {
            editor.add_sample(sample, brush);
        }
        editor.end_stroke().await.unwrap();
    }
    async fn stored(store: &MemoryLayerStore, editor: &Editor<ManualClock>) -> Option<Vec<u8>> {
        let id = editor.active_frame().layer(editor.active_role());
        store.get_layer(id).await.unwrap()
    }

    /// A store that can hold one `get_layer` after it has read, until released.
    #[derive(Default)]
    struct HeldStore {
        inner: MemoryLayerStore,
        hold: parking_lot::Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    }
    impl HeldStore {
        /// Returns a receiver that fires once the next read is held, and the sender releasing it.
        fn hold_next_read(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
            let (held_tx, held_rx) = oneshot::channel();
            let (release_tx, release_rx) = oneshot::channel();
            *self.hold.lock() = Some((held_tx, release_rx));
            (held_rx, release_tx)
        }
    }
    #[async_trait::async_trait]
    impl LayerStore for HeldStore {
        async fn initialize(&self) -> Result<(), StoreError> {
            self.inner.initialize().await
        }
        async fn put_layer(&self, id: LayerID, blob: Vec<u8>) -> Result<(), StoreError> {
            self.inner.put_layer(id, blob).await
        }
        async fn get_layer(&self, id: LayerID) -> Result<Option<Vec<u8>>, StoreError> {
            let blob = self.inner.get_layer(id).await?;
            let hold = self.hold.lock().take();
            if let Some((held, release)) = hold {
                let _ = held.send(());
                let _ = release.await;
            }
            Ok(blob)
        }
        async fn delete_layer(&self, id: LayerID) -> Result<(), StoreError> {
            self.inner.delete_layer(id).await
        }
        async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError> {
            self.inner.put_frame(frame).await
        }
        async fn delete_frame(&self, id: FrameID) -> Result<(), StoreError> {
            self.inner.delete_frame(id).await
        }
        async fn get_all_frames(&self) -> Result<Vec<Frame>, StoreError> {
            self.inner.get_all_frames().await
        }
    }

    #[tokio::test]
    async fn opens_with_one_frame() {
        let (store, editor, _) = editor().await;
        assert_eq!(editor.frames().len(), 1);
        assert_eq!(store.get_all_frames().await.unwrap().len(), 1);
        assert!(editor.surface().is_blank());
    }
    #[tokio::test]
    async fn stroke_is_saved() {
        let (store, mut editor, _) = editor().await;
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        assert!(!editor.surface().is_blank());
        let blob = stored(&store, &editor).await.unwrap();
        assert_eq!(&codec::decode(&blob, [32, 32]).unwrap(), editor.surface());
    }
    #[tokio::test]
    async fn undo_redo_symmetry() {
        let (store, mut editor, _) = editor().await;
        let colors = [
            Rgba::BLACK,
            Rgba::opaque(255, 0, 0),
            Rgba::opaque(0, 255, 0),
            Rgba::opaque(0, 0, 255),
        ];
        for (i, color) in colors.into_iter().enumerate() {
            scribble(&mut editor, &brush(color), i as f32).await;
        }
        let after = editor.surface().clone();
        let after_blob = stored(&store, &editor).await;

        for _ in &colors {
            assert!(editor.undo().await.unwrap().is_some());
        }
        assert!(editor.surface().is_blank());
        // The very first snapshot was of a layer with no blob at all.
        assert_eq!(stored(&store, &editor).await, None);
        assert!(editor.undo().await.unwrap().is_none());

        for _ in &colors {
            assert!(editor.redo().await.unwrap().is_some());
        }
        assert!(editor.redo().await.unwrap().is_none());
        assert_eq!(editor.surface(), &after);
        assert_eq!(stored(&store, &editor).await, after_blob);
    }
    #[tokio::test]
    async fn undo_rerenders() {
        let (_, mut editor, _) = editor().await;
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        let composite = editor.undo().await.unwrap().unwrap();
        assert!(composite.is_blank());
    }
    #[tokio::test]
    async fn history_capacity() {
        let (_, mut editor, _) = editor().await;
        for i in 0..25 {
            scribble(&mut editor, &brush(Rgba::BLACK), i as f32 * 0.1).await;
        }
        let mut undone = 0;
        while editor.undo().await.unwrap().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 20);
        // Oldest five edits could not be undone.
        assert!(!editor.surface().is_blank());
    }
    #[tokio::test]
    async fn history_resets_on_navigation() {
        let (_, mut editor, _) = editor().await;
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        assert!(editor.can_undo());
        // Same pair, kept.
        editor.select_layer(LayerRole::Lineart).await.unwrap();
        assert!(editor.can_undo());

        editor.select_layer(LayerRole::Color).await.unwrap();
        assert!(!editor.can_undo());
        editor.select_layer(LayerRole::Lineart).await.unwrap();
        assert!(!editor.can_undo());
        // The stroke itself survives, only its history is gone.
        assert!(!editor.surface().is_blank());

        scribble(&mut editor, &brush(Rgba::BLACK), 1.0).await;
        editor.add_frame().await.unwrap();
        assert!(!editor.can_undo());
    }
    #[tokio::test]
    async fn switching_commits_stroke() {
        let (store, mut editor, _) = editor().await;
        let brush = brush(Rgba::BLACK);
        editor
            .start_stroke(StrokeSample::new(4.0, 4.0, 1.0), &brush)
            .await
            .unwrap();
        editor.add_sample(StrokeSample::new(20.0, 4.0, 1.0), &brush);
        let lineart = editor.active_frame().layer(LayerRole::Lineart);
        // No pointer-up.
        editor.select_layer(LayerRole::Color).await.unwrap();
        assert!(store.get_layer(lineart).await.unwrap().is_some());
        assert!(editor.surface().is_blank());
    }
    #[tokio::test]
    async fn fill() {
        let (store, mut editor, _) = editor().await;
        assert!(!editor.fill(3, 3, "not a color").await.unwrap());
        assert!(!editor.can_undo());

        assert!(editor.fill(3, 3, "#00ff00").await.unwrap());
        assert!(editor
            .surface()
            .pixels()
            .iter()
            .all(|&p| p == Rgba::opaque(0, 255, 0)));
        assert!(stored(&store, &editor).await.is_some());
        // Already that color.
        assert!(!editor.fill(0, 0, "#00ff00").await.unwrap());
        // Outside.
        assert!(!editor.fill(-1, 0, "#ff0000").await.unwrap());

        editor.undo().await.unwrap();
        assert!(editor.surface().is_blank());
        assert!(!editor.can_undo());
    }
    #[tokio::test]
    async fn fill_tool_through_stroke() {
        let (_, mut editor, _) = editor().await;
        let bucket = BrushConfig::new(Tool::Fill, 1.0, Rgba::opaque(0, 0, 255));
        let outcome = editor
            .start_stroke(StrokeSample::new(1.5, 1.5, 1.0), &bucket)
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Filled(32 * 32));
        let outcome = editor
            .start_stroke(StrokeSample::new(1.5, 1.5, 1.0), &bucket)
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Filled(0));
        assert!(editor.undo().await.unwrap().is_some());
        assert!(!editor.can_undo());
    }
    /// A red rectangle filled green changes exactly the rectangle.
    #[tokio::test]
    async fn fill_rectangle() {
        let store = Arc::new(MemoryLayerStore::new());
        store.initialize().await.unwrap();
        let frame = Frame::new_empty(0);
        store.put_frame(&frame).await.unwrap();
        let size = [400, 400];
        let red = Rgba::opaque(255, 0, 0);
        let mut layer = Raster::with_size(size);
        for y in 100..=300 {
            for x in 100..=300 {
                layer.set(x, y, red);
            }
        }
        store
            .put_layer(frame.layer(LayerRole::Color), codec::encode(&layer).unwrap())
            .await
            .unwrap();

        let settings = EditorSettings {
            canvas: size,
            ..EditorSettings::default()
        };
        let mut editor = Editor::open_with_clock(store.clone(), settings, ManualClock::new())
            .await
            .unwrap();
        editor.select_layer(LayerRole::Color).await.unwrap();
        assert!(editor.fill(200, 200, "#00ff00").await.unwrap());
        for y in 0..400 {
            for x in 0..400 {
                let inside = (100..=300).contains(&x) && (100..=300).contains(&y);
                let expected = if inside {
                    Rgba::opaque(0, 255, 0)
                } else {
                    Rgba::TRANSPARENT
                };
                assert_eq!(editor.surface().get(x, y), Some(expected), "at ({x}, {y})");
            }
        }
    }
    #[tokio::test]
    async fn duplicate_last_of_three() {
        let (store, mut editor, _) = editor().await;
        editor.add_frame().await.unwrap();
        editor.add_frame().await.unwrap();
        assert_eq!(editor.active_index(), 2);
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        editor.select_layer(LayerRole::Color).await.unwrap();
        assert!(editor.fill(0, 0, "#336699").await.unwrap());

        let source = *editor.active_frame();
        assert_eq!(editor.duplicate_frame(2).await.unwrap(), 3);
        assert_eq!(editor.frames().len(), 4);
        assert!(editor.frames().is_contiguous());
        let copy = editor.frames()[3];
        assert_eq!(copy.index, 3);
        for role in LayerRole::ALL {
            assert_ne!(copy.layer(role), source.layer(role));
            assert_eq!(
                store.get_layer(copy.layer(role)).await.unwrap(),
                store.get_layer(source.layer(role)).await.unwrap(),
            );
        }
        // Still on the source.
        assert_eq!(editor.active_frame().id, source.id);
    }
    #[tokio::test]
    async fn duplicate_shifts_successors() {
        let (store, mut editor, _) = editor().await;
        editor.add_frame().await.unwrap();
        editor.add_frame().await.unwrap();
        let before: Vec<Frame> = editor.frames().iter().copied().collect();

        editor.duplicate_frame(1).await.unwrap();
        let after = editor.frames();
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[1].id, before[1].id);
        assert_eq!(after[3].id, before[2].id);
        assert_eq!(after[3].index, 3);
        // Active frame followed its shift.
        assert_eq!(editor.active_index(), 3);

        let mut persisted = store.get_all_frames().await.unwrap();
        persisted.sort_by_key(|frame| frame.index);
        assert_eq!(persisted, after.iter().copied().collect::<Vec<_>>());
    }
    #[tokio::test]
    async fn delete() {
        let (store, mut editor, _) = editor().await;
        assert!(matches!(editor.delete_frame(0).await, Err(EditorError::LastFrame)));
        assert!(matches!(editor.delete_frame(3).await, Err(EditorError::NoSuchFrame(3))));

        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        let doomed = *editor.active_frame();
        editor.add_frame().await.unwrap();
        editor.select_frame(0).await.unwrap();
        editor.delete_frame(0).await.unwrap();

        assert_eq!(editor.frames().len(), 1);
        assert_eq!(editor.active_index(), 0);
        assert_eq!(editor.frames()[0].index, 0);
        assert!(editor.surface().is_blank());
        for role in LayerRole::ALL {
            assert_eq!(store.get_layer(doomed.layer(role)).await.unwrap(), None);
        }
        assert_eq!(store.get_all_frames().await.unwrap(), [editor.frames()[0]]);
    }
    #[tokio::test]
    async fn ordering_survives_edits() {
        let (store, mut editor, _) = editor().await;
        let mut state = 0x9e37_79b9_u32;
        for _ in 0..60 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let len = editor.frames().len();
            let target = state as usize % len;
            match (state >> 8) % 4 {
                0 => {
                    editor.select_frame(target).await.unwrap();
                    editor.add_frame().await.unwrap();
                }
                1 => {
                    editor.duplicate_frame(target).await.unwrap();
                }
                _ if len > 1 => editor.delete_frame(target).await.unwrap(),
                _ => {
                    editor.add_frame().await.unwrap();
                }
            }
            assert!(editor.frames().is_contiguous());
            assert!(editor.active_index() < editor.frames().len());
        }
        let mut persisted = store.get_all_frames().await.unwrap();
        persisted.sort_by_key(|frame| frame.index);
        assert!(persisted.iter().enumerate().all(|(i, frame)| frame.index == i));
        assert_eq!(persisted, editor.frames().iter().copied().collect::<Vec<_>>());
    }
    #[tokio::test]
    async fn renumbers_on_open() {
        let store = Arc::new(MemoryLayerStore::new());
        store.initialize().await.unwrap();
        let late = Frame::new_empty(7);
        let early = Frame::new_empty(3);
        store.put_frame(&late).await.unwrap();
        store.put_frame(&early).await.unwrap();

        let editor = Editor::open_with_clock(store.clone(), settings(), ManualClock::new())
            .await
            .unwrap();
        assert_eq!(editor.frames()[0].id, early.id);
        assert_eq!(editor.frames()[1].id, late.id);
        let mut persisted = store.get_all_frames().await.unwrap();
        persisted.sort_by_key(|frame| frame.index);
        assert_eq!(persisted.iter().map(|f| f.index).collect::<Vec<_>>(), [0, 1]);
    }
    #[tokio::test]
    async fn view_and_onion() {
        let (_, mut editor, _) = editor().await;
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        editor.add_frame().await.unwrap();
        editor.add_frame().await.unwrap();
        editor.select_frame(1).await.unwrap();
        let view = editor.render_view().await.unwrap();
        assert!(view.previous.is_some());
        assert!(view.next.is_some());
        assert!(view.frame.is_blank());
        // Only frame 0 has ink, so the ghost underneath is all that shows.
        assert!(view.next.as_ref().unwrap().is_blank());
        assert_eq!(&view.flatten(), view.previous.as_ref().unwrap());
    }
    #[tokio::test]
    async fn render_shows_stroke_in_progress() {
        let (_, mut editor, _) = editor().await;
        let brush = brush(Rgba::BLACK);
        editor
            .start_stroke(StrokeSample::new(4.0, 4.0, 1.0), &brush)
            .await
            .unwrap();
        editor.add_sample(StrokeSample::new(20.0, 4.0, 1.0), &brush);
        let composite = editor.render_frame(0).await.unwrap();
        assert_eq!(composite.get(12, 4), Some(Rgba::BLACK));
    }
    #[tokio::test]
    async fn playback() {
        let (_, mut editor, clock) = editor().await;
        editor.add_frame().await.unwrap();
        editor.add_frame().await.unwrap();
        editor.select_frame(0).await.unwrap();
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;

        editor.play().await.unwrap();
        assert!(editor.is_playing());
        // Input and onion skin are off during playback.
        let outcome = editor
            .start_stroke(StrokeSample::new(1.0, 1.0, 1.0), &brush(Rgba::BLACK))
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Ignored);
        let skin = editor.render_onion_skin(1).await.unwrap();
        assert!(skin.previous.is_none() && skin.next.is_none());

        assert_eq!(editor.tick().await.unwrap(), None);
        clock.advance(Duration::from_millis(250));
        assert_eq!(editor.tick().await.unwrap(), Some(2));
        assert_eq!(editor.active_index(), 2);
        assert!(!editor.can_undo());
        clock.advance(Duration::from_millis(100));
        assert_eq!(editor.tick().await.unwrap(), Some(0));
        assert!(!editor.surface().is_blank());

        editor.stop();
        clock.advance(Duration::from_millis(500));
        assert_eq!(editor.tick().await.unwrap(), None);
        assert_eq!(editor.active_index(), 0);

        assert!(editor.set_rate(0.0).is_err());
        editor.set_rate(24.0).unwrap();
        assert_eq!(editor.settings().frame_rate, 24.0);
    }
    /// A composite read still in flight while the layer is saved must not put the
    /// older pixels back in the cache, where the editor would later save over the newer ones.
    #[tokio::test]
    async fn read_racing_a_save_is_not_cached() {
        let store = Arc::new(HeldStore::default());
        let mut editor = Editor::open_with_clock(store.clone(), settings(), ManualClock::new())
            .await
            .unwrap();
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        let layer = editor.active_frame().layer(LayerRole::Lineart);

        let (held, release) = store.hold_next_read();
        let renderer = editor.compositor();
        let reader = tokio::spawn(async move { renderer.resolve_layer(layer).await });
        held.await.unwrap();

        // The read has the first stroke. Save a second one under it.
        scribble(&mut editor, &brush(Rgba::opaque(255, 0, 0)), 2.0).await;
        let second = editor.surface().clone();
        release.send(()).unwrap();
        let late = reader.await.unwrap().unwrap().unwrap();
        assert_ne!(*late, second);

        editor.select_layer(LayerRole::Color).await.unwrap();
        editor.select_layer(LayerRole::Lineart).await.unwrap();
        assert_eq!(editor.surface(), &second);

        scribble(&mut editor, &brush(Rgba::opaque(0, 0, 255)), 4.0).await;
        let blob = store.inner.get_layer(layer).await.unwrap().unwrap();
        let persisted = codec::decode(&blob, [32, 32]).unwrap();
        assert_eq!(&persisted, editor.surface());
        assert_ne!(&persisted, &second);
    }
    #[tokio::test]
    async fn playback_follows_selection() {
        let (_, mut editor, clock) = editor().await;
        for _ in 0..3 {
            editor.add_frame().await.unwrap();
        }
        editor.select_frame(0).await.unwrap();
        editor.play().await.unwrap();

        editor.select_frame(2).await.unwrap();
        clock.advance(Duration::from_millis(100));
        assert_eq!(editor.tick().await.unwrap(), Some(3));

        // Deleting before the active frame shifts it down to 2.
        editor.delete_frame(0).await.unwrap();
        clock.advance(Duration::from_millis(100));
        assert_eq!(editor.tick().await.unwrap(), Some(0));

        // Inserted after frame 0 and selected.
        assert_eq!(editor.add_frame().await.unwrap(), 1);
        clock.advance(Duration::from_millis(100));
        assert_eq!(editor.tick().await.unwrap(), Some(2));
        assert_eq!(editor.active_index(), 2);
    }
    #[tokio::test]
    async fn stale_tickets() {
        let (_, mut editor, _) = editor().await;
        editor.add_frame().await.unwrap();
        let presenter = editor.presenter();
        let ticket = editor.ticket();
        let renderer = editor.compositor();
        let frame = *editor.active_frame();

        // Frame switch while the composite is outstanding.
        editor.select_frame(0).await.unwrap();
        let composite = renderer.render_frame(&frame).await.unwrap();
        assert!(presenter.accept(&ticket, composite).is_none());

        let ticket = editor.ticket();
        let composite = renderer.render_frame(editor.active_frame()).await.unwrap();
        assert!(presenter.accept(&ticket, composite).is_some());
    }
    #[tokio::test]
    async fn sqlite_project() {
        let store: Arc<dyn LayerStore> = Arc::new(SqliteLayerStore::in_memory());
        let mut editor = Editor::open_with_clock(store.clone(), settings(), ManualClock::new())
            .await
            .unwrap();
        scribble(&mut editor, &brush(Rgba::BLACK), 0.0).await;
        editor.add_frame().await.unwrap();
        let drawn = editor.render_frame(0).await.unwrap();
        drop(editor);

        // Same connection, fresh editor and cache.
        let editor = Editor::open_with_clock(store, settings(), ManualClock::new())
            .await
            .unwrap();
        assert_eq!(editor.frames().len(), 2);
        assert_eq!(editor.render_frame(0).await.unwrap(), drawn);
        assert_eq!(editor.render_frame(0).await.unwrap(), *editor.surface());
    }
    #[tokio::test]
    async fn rejects_bad_settings() {
        let store = Arc::new(MemoryLayerStore::new());
        let bad = EditorSettings {
            frame_rate: -1.0,
            ..settings()
        };
        assert!(matches!(
            Editor::open_with_clock(store, bad, ManualClock::new()).await,
            Err(EditorError::Settings(_))
        ));
    }
}
