use log::{error, info, warn};
use crate::backend::DisplayBackend;
use crate::blit::Rect;
use crate::compositor::{
    ComposeReport, Compositor, DirtyState, Layer, LayerSet, CLIP_MARGIN, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};
use crate::error::DisplayError;
use crate::movie::MoviePlayer;
use crate::palette::{ColorTables, Palette, Rgb};
use crate::pixel_format::{self, PixelFormat};
use crate::surface::{OffscreenBuffer, SurfaceRegistry};
use crate::{HEIGHT, WIDTH};

/// Display state of a running game: negotiated format, color tables, the
/// surface pool with the layer buffers, the presentation buffer and the
/// cutscene player.
pub struct RenderContext {
    format: PixelFormat,
    tables: ColorTables,
    palette: Palette,
    registry: SurfaceRegistry,
    screen: OffscreenBuffer,
    compositor: Compositor,
    movie: MoviePlayer,
    fullscreen_request: Option<bool>,
    released: bool,
}

impl RenderContext {
    /// Negotiates the pixel format and allocates every mandatory buffer.
    /// Nothing stays allocated on failure.
    pub fn init<B: DisplayBackend + ?Sized>(backend: &mut B, palette: &Palette) -> Result<Self, DisplayError> {
        let (format, tables) = pixel_format::negotiate(&*backend, palette)?;

        let mut registry = SurfaceRegistry::new(format);
        registry.set_palette(palette);

        let buffers = LayerSet::create(&mut registry, backend)
            .and_then(|layers| Ok((layers, backend.create_surface(WIDTH, HEIGHT, format)?)));
        let (layers, mut screen) = match buffers {
            Ok(buffers) => buffers,
            Err(e) => {
                error!("couldn't create the display buffers: {}", e);
                registry.destroy_all();
                return Err(e.into());
            }
        };
        if format.is_indexed() {
            screen.set_palette(Some(palette));
        }

        match backend.open_joysticks() {
            Ok(0) => info!("no joystick found"),
            Ok(count) => info!("{} joystick(s) opened", count),
            Err(e) => warn!("joysticks unavailable: {}", e),
        }

        info!(
            "display ready: {}x{}, {} bits per pixel, {} bytes of color tables",
            WIDTH,
            HEIGHT,
            format.bits_per_pixel(),
            tables.table_bytes()
        );

        Ok(Self {
            format,
            tables,
            palette: palette.clone(),
            movie: MoviePlayer::new(format, palette),
            registry,
            screen,
            compositor: Compositor::new(layers),
            fullscreen_request: None,
            released: false,
        })
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn tables(&self) -> &ColorTables {
        &self.tables
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replaces the game palette and everything derived from it.
    pub fn set_palette(&mut self, palette: &Palette) {
        self.palette = palette.clone();
        self.tables.rebuild(palette);
        self.registry.set_palette(palette);
        if self.format.is_indexed() && !self.movie.is_playing() {
            self.screen.set_palette(Some(palette));
        }
        self.compositor.dirty_mut().request_full_redraw();
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn layer(&self, layer: Layer) -> Option<&OffscreenBuffer> {
        let handle = self.compositor.layers().handle(layer)?;
        self.registry.get(handle)
    }

    /// Buffer the simulation draws a layer into.
    pub fn layer_mut(&mut self, layer: Layer) -> Option<&mut OffscreenBuffer> {
        let handle = self.compositor.layers().handle(layer)?;
        self.registry.get_mut(handle)
    }

    pub fn dirty(&self) -> &DirtyState {
        self.compositor.dirty()
    }

    pub fn dirty_mut(&mut self) -> &mut DirtyState {
        self.compositor.dirty_mut()
    }

    /// The last composed frame.
    pub fn screen(&self) -> &OffscreenBuffer {
        &self.screen
    }

    /// Starts a cutscene with its own palette. A full pool only costs the
    /// cutscene.
    pub fn start_movie<B: DisplayBackend + ?Sized>(&mut self, backend: &mut B, palette: &Palette) -> bool {
        match self.movie.start(backend, &mut self.registry, palette) {
            Ok(()) => true,
            Err(e) => {
                warn!("movie disabled: {}", e);
                false
            }
        }
    }

    pub fn stop_movie(&mut self) -> bool {
        if !self.movie.stop(&mut self.registry) {
            return false;
        }
        if self.format.is_indexed() {
            self.screen.set_palette(Some(&self.palette));
        }
        self.compositor.dirty_mut().request_full_redraw();
        true
    }

    pub fn is_movie_playing(&self) -> bool {
        self.movie.is_playing()
    }

    pub fn movie_frame_mut(&mut self) -> Option<&mut [u8]> {
        self.movie.frame_mut()
    }

    pub fn set_movie_palette(&mut self, palette: &Palette) {
        self.movie.set_palette(palette);
    }

    fn black(&self) -> u32 {
        self.tables.encode_rgb(Rgb::BLACK)
    }

    /// The window lost its contents: blank the screen and redraw everything.
    pub fn invalidate(&mut self) {
        let black = self.black();
        self.screen.fill(black);
        self.compositor.dirty_mut().request_full_redraw();
    }

    /// Blanks the visible part of the playfield.
    pub fn clear_viewport(&mut self) {
        let black = self.black();
        if let Some(viewport) = self.layer_mut(Layer::Viewport) {
            viewport.fill_rect(Rect::new(CLIP_MARGIN, CLIP_MARGIN, VIEWPORT_WIDTH, VIEWPORT_HEIGHT), black);
        }
    }

    pub fn request_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen_request = Some(fullscreen);
    }

    pub fn take_fullscreen_request(&mut self) -> Option<bool> {
        self.fullscreen_request.take()
    }

    /// Builds this tick's frame and shows it.
    pub fn compose<B: DisplayBackend + ?Sized>(&mut self, backend: &mut B) -> ComposeReport {
        let mut report = if self.movie.is_playing() {
            self.compositor.dirty_mut().request_full_redraw();
            self.movie.compose(backend, &mut self.registry, &mut self.screen)
        } else {
            self.compositor.compose(backend, &self.registry, &mut self.screen)
        };

        match backend.present(&self.screen) {
            Ok(()) => report.presented = true,
            Err(e) => error!("{}", e),
        }
        report
    }

    /// Frees every buffer. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.movie.stop(&mut self.registry);
        self.registry.destroy_all();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{ComposeKind, HudDirty};
    use crate::pixel_format::Depth;
    use crate::surface::POOL_CAPACITY;
    use crate::test_support::RecordingBackend;
    use std::vec;

    fn context(depth: Depth) -> (RecordingBackend, RenderContext) {
        let mut backend = RecordingBackend::new(depth);
        let render = RenderContext::init(&mut backend, &Palette::default()).unwrap();
        (backend, render)
    }

    #[test]
    fn test_init_allocates_the_four_layers() {
        let (backend, render) = context(Depth::Rgb16);
        assert_eq!(render.registry().live_count(), 4);
        assert!(backend.joysticks_open);
        assert_eq!(render.layer(Layer::Viewport).map(|b| (b.width(), b.height())), Some((512, 440)));
        assert_eq!(render.layer(Layer::Hud).map(|b| b.width()), Some(320));
        assert_eq!(render.layer(Layer::OptionPanel).map(|b| b.height()), Some(184));
        assert_eq!(render.layer(Layer::ScorePanel).map(|b| b.width()), Some(128));
        assert!(render.layer(Layer::Movie).is_none());
    }

    #[test]
    fn test_init_fails_when_surfaces_run_out() {
        let mut backend = RecordingBackend::new(Depth::Rgb32);
        backend.surface_budget = Some(2);
        let result = RenderContext::init(&mut backend, &Palette::default());
        assert!(matches!(result, Err(DisplayError::Surface(_))));
    }

    #[test]
    fn test_init_rejects_shallow_displays() {
        let mut backend = RecordingBackend::new(Depth::Rgb32);
        backend.format = crate::pixel_format::TextureFormat::new(4, 1);
        assert!(matches!(
            RenderContext::init(&mut backend, &Palette::default()),
            Err(DisplayError::UnsupportedDepth { .. })
        ));
    }

    #[test]
    fn test_movie_overrides_composition_then_full_redraw() {
        let (mut backend, mut render) = context(Depth::Rgb24);
        render.compose(&mut backend);
        backend.take_blits();

        assert!(render.start_movie(&mut backend, &Palette::default()));
        render.dirty_mut().mark(HudDirty::SCORE_DIGITS);
        let report = render.compose(&mut backend);
        assert_eq!(report.kind, ComposeKind::Movie);
        assert_eq!(backend.take_blits(), vec![Layer::Movie]);

        assert!(render.stop_movie());
        let report = render.compose(&mut backend);
        assert_eq!(report.kind, ComposeKind::Full);
        assert_eq!(
            backend.take_blits(),
            vec![Layer::Viewport, Layer::Hud, Layer::OptionPanel, Layer::ScorePanel]
        );
        assert_eq!(render.registry().live_count(), 4);
    }

    #[test]
    fn test_movie_refused_when_pool_is_full() {
        let (mut backend, mut render) = context(Depth::Rgb16);
        for _ in 4..POOL_CAPACITY {
            render.registry.create(&mut backend, 1, 1).unwrap();
        }
        assert!(!render.start_movie(&mut backend, &Palette::default()));
        assert!(!render.is_movie_playing());
        assert_eq!(render.compose(&mut backend).kind, ComposeKind::Full);
    }

    #[test]
    fn test_invalidate_blanks_and_forces_full_redraw() {
        let (mut backend, mut render) = context(Depth::Rgb32);
        render.compose(&mut backend);
        render.screen.fill(0xffffff);
        render.invalidate();
        assert_eq!(render.screen().get_pixel(5, 5), Some(0));
        assert!(render.dirty().needs_full_redraw());
    }

    #[test]
    fn test_clear_viewport_only_touches_the_visible_area() {
        let (_, mut render) = context(Depth::Rgb16);
        render.layer_mut(Layer::Viewport).unwrap().fill(0xffff);
        render.clear_viewport();
        let viewport = render.layer(Layer::Viewport).unwrap();
        assert_eq!(viewport.get_pixel(128, 128), Some(0));
        assert_eq!(viewport.get_pixel(383, 311), Some(0));
        assert_eq!(viewport.get_pixel(127, 128), Some(0xffff));
        assert_eq!(viewport.get_pixel(384, 311), Some(0xffff));
    }

    #[test]
    fn test_present_failure_is_reported_not_fatal() {
        let (mut backend, mut render) = context(Depth::Rgb16);
        backend.fail_present = true;
        let report = render.compose(&mut backend);
        assert!(!report.presented);
        assert!(render.dirty().is_clean());
    }

    #[test]
    fn test_palette_change_rebuilds_tables_and_redraws() {
        let (mut backend, mut render) = context(Depth::Indexed8);
        render.compose(&mut backend);
        let mut palette = Palette::default();
        palette.set(0, Rgb::new(1, 2, 3));
        render.set_palette(&palette);

        assert_eq!(render.tables().decode(0), Rgb::new(1, 2, 3));
        assert_eq!(render.screen().palette().map(|p| p.get(0)), Some(Rgb::new(1, 2, 3)));
        assert_eq!(render.layer(Layer::Hud).and_then(|b| b.palette()).map(|p| p.get(0)), Some(Rgb::new(1, 2, 3)));
        assert!(render.dirty().needs_full_redraw());
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut backend, mut render) = context(Depth::Rgb32);
        render.start_movie(&mut backend, &Palette::default());
        render.release();
        render.release();
        assert!(render.is_released());
        assert_eq!(render.registry().live_count(), 0);
        assert!(!render.is_movie_playing());
    }
}
