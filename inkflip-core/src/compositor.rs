//! Assembling displayable frames from their three layers.
//!
//! Layers resolve through the [`RasterCache`] first and the store second. A layer
//! with no blob, or one that fails to decode, is drawn as nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    blend::CompositeOp,
    cache::RasterCache,
    codec,
    color::Rgba,
    raster::Raster,
    settings::OnionSettings,
    state::{Frame, FrameID, FrameSequence, LayerID, LayerRole},
    store::{LayerStore, StoreError},
};

/// Tint over the previous frame's ghost.
pub const PREVIOUS_TINT: Rgba = Rgba::new(255, 0, 0, 128);
/// Tint over the next frame's ghost.
pub const NEXT_TINT: Rgba = Rgba::new(0, 0, 255, 128);

/// Translucent overlays of the neighbors of some frame. Either side may be missing.
#[derive(Clone, Debug, Default)]
pub struct OnionSkin {
    /// Drawn beneath the frame.
    pub previous: Option<Raster>,
    /// Drawn above the frame.
    pub next: Option<Raster>,
}

#[derive(Clone)]
pub struct CompositeRenderer {
    store: Arc<dyn LayerStore>,
    cache: Arc<parking_lot::Mutex<RasterCache>>,
    canvas: [u32; 2],
}
impl CompositeRenderer {
    pub fn new(
        store: Arc<dyn LayerStore>,
        cache: Arc<parking_lot::Mutex<RasterCache>>,
        canvas: [u32; 2],
    ) -> Self {
        Self {
            store,
            cache,
            canvas,
        }
    }
    #[must_use]
    pub fn canvas(&self) -> [u32; 2] {
        self.canvas
    }
    /// Fetch the decoded layer, `None` if it has no usable pixels.
    ///
    /// Store failures propagate. Decode failures do not.
    pub async fn resolve_layer(&self, id: LayerID) -> Result<Option<Arc<Raster>>, StoreError> {
        let stamp = {
            let mut cache = self.cache.lock();
            if let Some(raster) = cache.get(id) {
                log::trace!("cache hit {id}");
                return Ok(Some(raster));
            }
            cache.stamp()
        };
        log::debug!("cache miss {id}");
        let Some(blob) = self.store.get_layer(id).await? else {
            return Ok(None);
        };
        match codec::decode(&blob, self.canvas) {
            Ok(raster) => {
                let raster = Arc::new(raster);
                self.cache.lock().insert(id, raster.clone(), stamp);
                Ok(Some(raster))
            }
            Err(e) => {
                log::warn!("layer {id} is unreadable, drawing it as empty: {e}");
                Ok(None)
            }
        }
    }
    pub async fn render_frame(&self, frame: &Frame) -> Result<Raster, StoreError> {
        self.render_frame_with(frame, None).await
    }
    /// Render, substituting `live` for the stored contents of one role.
    pub async fn render_frame_with(
        &self,
        frame: &Frame,
        live: Option<(LayerRole, &Raster)>,
    ) -> Result<Raster, StoreError> {
        let mut target = Raster::with_size(self.canvas);
        for role in LayerRole::COMPOSITE_ORDER {
            match live {
                Some((live_role, surface)) if live_role == role => {
                    target.draw(surface, CompositeOp::SourceOver, 1.0);
                }
                _ => {
                    if let Some(layer) = self.resolve_layer(frame.layer(role)).await? {
                        target.draw(&layer, CompositeOp::SourceOver, 1.0);
                    }
                }
            }
        }
        Ok(target)
    }
    /// Render `frame` as a ghost: faded to `opacity`, then tinted where it has color.
    pub async fn render_ghost(
        &self,
        frame: &Frame,
        opacity: f32,
        tint: Rgba,
    ) -> Result<Raster, StoreError> {
        let composite = self.render_frame(frame).await?;
        let mut overlay = Raster::with_size(self.canvas);
        overlay.draw(&composite, CompositeOp::SourceOver, opacity);
        overlay.fill_with(tint, CompositeOp::SourceAtop);
        Ok(overlay)
    }
    /// Ghosts of the frames either side of `index`. Empty while playing or when disabled.
    pub async fn render_onion_skin(
        &self,
        frames: &FrameSequence,
        index: usize,
        onion: &OnionSettings,
        playing: bool,
    ) -> Result<OnionSkin, StoreError> {
        if playing || !onion.enabled {
            return Ok(OnionSkin::default());
        }
        let previous = match index.checked_sub(1).and_then(|i| frames.get(i)) {
            Some(frame) => Some(self.render_ghost(frame, onion.opacity, PREVIOUS_TINT).await?),
            None => None,
        };
        let next = match index.checked_add(1).and_then(|i| frames.get(i)) {
            Some(frame) => Some(self.render_ghost(frame, onion.opacity, NEXT_TINT).await?),
            None => None,
        };
        Ok(OnionSkin { previous, next })
    }
}

/// Which frame a pending composite was requested for, and when.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Ticket {
    pub frame: FrameID,
    generation: u64,
}

/// Decides whether a finished composite is still worth showing.
///
/// Every frame switch advances the generation, so results of fetches started before
/// the switch are discarded when they resolve.
#[derive(Clone, Default, Debug)]
pub struct Presenter {
    generation: Arc<AtomicU64>,
}
impl Presenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Invalidate every outstanding ticket.
    pub fn advance(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
    #[must_use]
    pub fn ticket(&self, frame: FrameID) -> Ticket {
        Ticket {
            frame,
            generation: self.generation.load(Ordering::Acquire),
        }
    }
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation.load(Ordering::Acquire)
    }
    /// Pass the result through if it is still current.
    pub fn accept<T>(&self, ticket: &Ticket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::debug!("discarding stale composite of {}", ticket.frame);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{CompositeRenderer, Presenter, NEXT_TINT, PREVIOUS_TINT};
    use crate::{
        cache::RasterCache,
        codec,
        color::Rgba,
        raster::Raster,
        settings::OnionSettings,
        state::{Frame, FrameID, FrameSequence, LayerRole},
        store::{LayerStore, MemoryLayerStore},
    };

    const SIZE: [u32; 2] = [4, 4];

    async fn renderer() -> (Arc<MemoryLayerStore>, CompositeRenderer) {
        let store = Arc::new(MemoryLayerStore::new());
        store.initialize().await.unwrap();
        let cache = Arc::new(parking_lot::Mutex::new(RasterCache::new(8)));
        let renderer = CompositeRenderer::new(store.clone(), cache, SIZE);
        (store, renderer)
    }
    async fn paint(store: &MemoryLayerStore, frame: &Frame, role: LayerRole, pixels: &[(u32, u32, Rgba)]) {
        let mut raster = Raster::with_size(SIZE);
        for &(x, y, color) in pixels {
            raster.set(x, y, color);
        }
        store
            .put_layer(frame.layer(role), codec::encode(&raster).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn layer_order() {
        let (store, renderer) = renderer().await;
        let frame = Frame::new_empty(0);
        let red = Rgba::opaque(255, 0, 0);
        let blue = Rgba::opaque(0, 0, 255);
        let white = Rgba::WHITE;
        paint(&store, &frame, LayerRole::Background, &[(0, 0, white), (1, 0, white), (2, 0, white)]).await;
        paint(&store, &frame, LayerRole::Color, &[(1, 0, red), (2, 0, red)]).await;
        paint(&store, &frame, LayerRole::Lineart, &[(2, 0, blue)]).await;

        let composite = renderer.render_frame(&frame).await.unwrap();
        assert_eq!(composite.get(0, 0), Some(white));
        assert_eq!(composite.get(1, 0), Some(red));
        assert_eq!(composite.get(2, 0), Some(blue));
        assert_eq!(composite.get(3, 0), Some(Rgba::TRANSPARENT));
    }
    #[tokio::test]
    async fn missing_and_corrupt_layers_are_empty() {
        let (store, renderer) = renderer().await;
        let frame = Frame::new_empty(0);
        store
            .put_layer(frame.layer(LayerRole::Color), b"not a png".to_vec())
            .await
            .unwrap();
        assert!(renderer.render_frame(&frame).await.unwrap().is_blank());
    }
    #[tokio::test]
    async fn populates_cache() {
        let (store, renderer) = renderer().await;
        let frame = Frame::new_empty(0);
        let id = frame.layer(LayerRole::Lineart);
        paint(&store, &frame, LayerRole::Lineart, &[(0, 0, Rgba::BLACK)]).await;
        renderer.render_frame(&frame).await.unwrap();
        // Served from the cache now, even with the store's copy gone.
        store.delete_layer(id).await.unwrap();
        let resolved = renderer.resolve_layer(id).await.unwrap().unwrap();
        assert_eq!(resolved.get(0, 0), Some(Rgba::BLACK));
        // Until invalidated.
        renderer.cache.lock().invalidate(id);
        assert!(renderer.resolve_layer(id).await.unwrap().is_none());
    }
    #[tokio::test]
    async fn live_surface_overrides_store() {
        let (store, renderer) = renderer().await;
        let frame = Frame::new_empty(0);
        paint(&store, &frame, LayerRole::Lineart, &[(0, 0, Rgba::BLACK)]).await;
        let mut live = Raster::with_size(SIZE);
        live.set(3, 3, Rgba::WHITE);
        let composite = renderer
            .render_frame_with(&frame, Some((LayerRole::Lineart, &live)))
            .await
            .unwrap();
        assert_eq!(composite.get(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(composite.get(3, 3), Some(Rgba::WHITE));
    }
    #[tokio::test]
    async fn onion_skin() {
        let (store, renderer) = renderer().await;
        let (frames, _) = FrameSequence::from_unordered((0..3).map(Frame::new_empty).collect());
        for frame in &frames {
            paint(&store, frame, LayerRole::Lineart, &[(0, 0, Rgba::BLACK)]).await;
        }
        let onion = OnionSettings {
            enabled: true,
            opacity: 0.5,
        };

        let skin = renderer.render_onion_skin(&frames, 1, &onion, false).await.unwrap();
        let previous = skin.previous.unwrap();
        let next = skin.next.unwrap();
        // Tinted where the neighbor had ink, alpha from the fade.
        let ghost = previous.get(0, 0).unwrap();
        assert_eq!(ghost.alpha(), 128);
        assert!(ghost.to_array()[0] > 100 && ghost.to_array()[2] == 0);
        let ghost = next.get(0, 0).unwrap();
        assert!(ghost.to_array()[2] > 100 && ghost.to_array()[0] == 0);
        // Untouched elsewhere.
        assert_eq!(previous.get(1, 1), Some(Rgba::TRANSPARENT));
        assert_eq!(next.get(1, 1), Some(Rgba::TRANSPARENT));

        // Edges skip their missing side.
        let skin = renderer.render_onion_skin(&frames, 0, &onion, false).await.unwrap();
        assert!(skin.previous.is_none() && skin.next.is_some());
        let skin = renderer.render_onion_skin(&frames, 2, &onion, false).await.unwrap();
        assert!(skin.previous.is_some() && skin.next.is_none());

        // Off while playing or disabled.
        let skin = renderer.render_onion_skin(&frames, 1, &onion, true).await.unwrap();
        assert!(skin.previous.is_none() && skin.next.is_none());
        let disabled = OnionSettings {
            enabled: false,
            ..onion
        };
        let skin = renderer.render_onion_skin(&frames, 1, &disabled, false).await.unwrap();
        assert!(skin.previous.is_none() && skin.next.is_none());
        assert_ne!(PREVIOUS_TINT, NEXT_TINT);
    }
    #[test]
    fn stale_tickets() {
        let presenter = Presenter::new();
        let ticket = presenter.ticket(FrameID::generate());
        assert_eq!(presenter.accept(&ticket, 1), Some(1));
        presenter.clone().advance();
        assert_eq!(presenter.accept(&ticket, 1), None);
    }
}
