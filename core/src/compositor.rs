use bitflags::bitflags;
use heapless::Vec as BoundedVec;
use log::{error, trace, warn};
use crate::backend::DisplayBackend;
use crate::blit::Rect;
use crate::error::SurfaceError;
use crate::surface::{OffscreenBuffer, SurfaceHandle, SurfaceRegistry};

// game playfield: the visible area plus a clipping margin on every side
pub const PLAYFIELD_WIDTH: u32 = 512;
pub const PLAYFIELD_HEIGHT: u32 = 440;
pub const CLIP_MARGIN: i32 = 128;
pub const VIEWPORT_WIDTH: u32 = 256;
pub const VIEWPORT_HEIGHT: u32 = 184;

pub const HUD_WIDTH: u32 = 320;
pub const HUD_HEIGHT: u32 = 16;
pub const OPTIONS_WIDTH: u32 = 64;
pub const OPTIONS_HEIGHT: u32 = 184;
pub const SCORE_PANEL_WIDTH: u32 = 128;
pub const SCORE_PANEL_HEIGHT: u32 = 16;

pub const VIEWPORT_ORIGIN: (i32, i32) = (0, HUD_HEIGHT as i32);
pub const OPTIONS_ORIGIN: (i32, i32) = (VIEWPORT_WIDTH as i32, HUD_HEIGHT as i32);
pub const SCORE_PANEL_ORIGIN: (i32, i32) = (68, 0);

pub const OPTION_SLOT_SIZE: u32 = 28;
/// Option slots queued for one frame before falling back to a full redraw.
pub const OPTION_STACK_CAPACITY: usize = 16;

pub const PLAYER_ENERGY_RECT: Rect = Rect::new(210, 3, 100, 9);
pub const BOSS_ENERGY_RECT: Rect = Rect::new(10, 3, 45, 9);
pub const MULTIPLIER_X2_RECT: Rect = Rect::new(41, 171, 14, 8);
pub const MULTIPLIER_X4_RECT: Rect = Rect::new(41, 5, 14, 8);

/// What a blit is drawing. Whole layers first, then the regions refreshed
/// on their own.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Viewport,
    Hud,
    OptionPanel,
    ScorePanel,
    OptionSlot,
    PlayerEnergy,
    BossEnergy,
    ScoreDigits,
    MultiplierX2,
    MultiplierX4,
    Movie,
}

bitflags! {
    /// HUD regions waiting to be copied to the screen.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct HudDirty: u8 {
        const PLAYER_ENERGY = 1 << 0;
        const BOSS_ENERGY = 1 << 1;
        const SCORE_DIGITS = 1 << 2;
        const MULTIPLIER_X2 = 1 << 3;
        const MULTIPLIER_X4 = 1 << 4;
    }
}

/// Pending invalidations, drained once per composed frame.
#[derive(Clone, Debug)]
pub struct DirtyState {
    update_all: bool,
    hud: HudDirty,
    option_slots: BoundedVec<(i32, i32), OPTION_STACK_CAPACITY>,
}

impl Default for DirtyState {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyState {
    /// The first frame is always a full redraw.
    pub fn new() -> Self {
        Self {
            update_all: true,
            hud: HudDirty::empty(),
            option_slots: BoundedVec::new(),
        }
    }

    pub fn request_full_redraw(&mut self) {
        self.update_all = true;
    }

    pub fn needs_full_redraw(&self) -> bool {
        self.update_all
    }

    pub fn mark(&mut self, regions: HudDirty) {
        self.hud |= regions;
    }

    pub fn hud(&self) -> HudDirty {
        self.hud
    }

    /// Queues the 28x28 option slot whose top-left corner is at (`x`, `y`)
    /// in option-panel coordinates.
    pub fn push_option_slot(&mut self, x: i32, y: i32) {
        if self.option_slots.push((x, y)).is_err() {
            warn!("option refresh stack full, falling back to a full redraw");
            self.update_all = true;
        }
    }

    pub fn pending_option_slots(&self) -> usize {
        self.option_slots.len()
    }

    pub fn is_clean(&self) -> bool {
        !self.update_all && self.hud.is_empty() && self.option_slots.is_empty()
    }

    fn take(&mut self, region: HudDirty) -> bool {
        let set = self.hud.contains(region);
        self.hud.remove(region);
        set
    }

    fn clear(&mut self) {
        self.update_all = false;
        self.hud = HudDirty::empty();
        self.option_slots.clear();
    }
}

/// The four buffers every frame is assembled from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LayerSet {
    pub viewport: SurfaceHandle,
    pub hud: SurfaceHandle,
    pub options: SurfaceHandle,
    pub score: SurfaceHandle,
}

impl LayerSet {
    pub fn create<B: DisplayBackend + ?Sized>(
        registry: &mut SurfaceRegistry,
        backend: &mut B,
    ) -> Result<Self, SurfaceError> {
        Ok(Self {
            viewport: registry.create(backend, PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT)?,
            hud: registry.create(backend, HUD_WIDTH, HUD_HEIGHT)?,
            options: registry.create(backend, OPTIONS_WIDTH, OPTIONS_HEIGHT)?,
            score: registry.create(backend, SCORE_PANEL_WIDTH, SCORE_PANEL_HEIGHT)?,
        })
    }

    /// Buffer a layer or sub-region is read from.
    pub fn handle(&self, layer: Layer) -> Option<SurfaceHandle> {
        match layer {
            Layer::Viewport => Some(self.viewport),
            Layer::Hud | Layer::PlayerEnergy | Layer::BossEnergy => Some(self.hud),
            Layer::OptionPanel | Layer::OptionSlot | Layer::MultiplierX2 | Layer::MultiplierX4 => {
                Some(self.options)
            }
            Layer::ScorePanel | Layer::ScoreDigits => Some(self.score),
            Layer::Movie => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComposeKind {
    Full,
    Incremental,
    Movie,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComposeReport {
    pub kind: ComposeKind,
    pub blits: usize,
    pub failures: usize,
    pub presented: bool,
}

impl ComposeReport {
    pub(crate) fn new(kind: ComposeKind) -> Self {
        Self { kind, blits: 0, failures: 0, presented: false }
    }

    /// Copies one region through the backend. Failures are logged and
    /// counted; the frame carries on.
    pub(crate) fn blit<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        layer: Layer,
        src: Option<&OffscreenBuffer>,
        src_rect: Rect,
        target: &mut OffscreenBuffer,
        (x, y): (i32, i32),
    ) {
        self.blits += 1;
        let Some(src) = src else {
            error!("blit of {:?} skipped: its buffer is gone", layer);
            self.failures += 1;
            return;
        };
        if let Err(e) = backend.blit(layer, src, src_rect, target, x, y) {
            error!("blit of {:?} failed: {}", layer, e);
            self.failures += 1;
        }
    }
}

pub struct Compositor {
    layers: LayerSet,
    dirty: DirtyState,
}

impl Compositor {
    pub fn new(layers: LayerSet) -> Self {
        Self { layers, dirty: DirtyState::new() }
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn dirty(&self) -> &DirtyState {
        &self.dirty
    }

    pub fn dirty_mut(&mut self) -> &mut DirtyState {
        &mut self.dirty
    }

    /// Assembles the frame in `target`: everything on a full redraw, else
    /// the viewport plus whatever was marked dirty.
    pub fn compose<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        registry: &SurfaceRegistry,
        target: &mut OffscreenBuffer,
    ) -> ComposeReport {
        let layers = self.layers;
        let viewport = Rect::new(CLIP_MARGIN, CLIP_MARGIN, VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
        let hud = registry.get(layers.hud);
        let options = registry.get(layers.options);
        let score = registry.get(layers.score);

        if self.dirty.update_all {
            let mut report = ComposeReport::new(ComposeKind::Full);
            report.blit(backend, Layer::Viewport, registry.get(layers.viewport), viewport, target, VIEWPORT_ORIGIN);
            report.blit(backend, Layer::Hud, hud, Rect::new(0, 0, HUD_WIDTH, HUD_HEIGHT), target, (0, 0));
            report.blit(
                backend,
                Layer::OptionPanel,
                options,
                Rect::new(0, 0, OPTIONS_WIDTH, OPTIONS_HEIGHT),
                target,
                OPTIONS_ORIGIN,
            );
            report.blit(
                backend,
                Layer::ScorePanel,
                score,
                Rect::new(0, 0, SCORE_PANEL_WIDTH, SCORE_PANEL_HEIGHT),
                target,
                SCORE_PANEL_ORIGIN,
            );
            self.dirty.clear();
            trace!("full redraw: {} blits", report.blits);
            return report;
        }

        let mut report = ComposeReport::new(ComposeKind::Incremental);
        report.blit(backend, Layer::Viewport, registry.get(layers.viewport), viewport, target, VIEWPORT_ORIGIN);

        while let Some((x, y)) = self.dirty.option_slots.pop() {
            report.blit(
                backend,
                Layer::OptionSlot,
                options,
                Rect::new(x, y, OPTION_SLOT_SIZE, OPTION_SLOT_SIZE),
                target,
                (OPTIONS_ORIGIN.0 + x, OPTIONS_ORIGIN.1 + y),
            );
        }

        let in_options = |r: Rect| (OPTIONS_ORIGIN.0 + r.x, OPTIONS_ORIGIN.1 + r.y);
        let regions = [
            (HudDirty::MULTIPLIER_X2, Layer::MultiplierX2, options, MULTIPLIER_X2_RECT, in_options(MULTIPLIER_X2_RECT)),
            (HudDirty::MULTIPLIER_X4, Layer::MultiplierX4, options, MULTIPLIER_X4_RECT, in_options(MULTIPLIER_X4_RECT)),
            (HudDirty::PLAYER_ENERGY, Layer::PlayerEnergy, hud, PLAYER_ENERGY_RECT, (PLAYER_ENERGY_RECT.x, PLAYER_ENERGY_RECT.y)),
            (HudDirty::BOSS_ENERGY, Layer::BossEnergy, hud, BOSS_ENERGY_RECT, (BOSS_ENERGY_RECT.x, BOSS_ENERGY_RECT.y)),
            (
                HudDirty::SCORE_DIGITS,
                Layer::ScoreDigits,
                score,
                Rect::new(0, 0, SCORE_PANEL_WIDTH, SCORE_PANEL_HEIGHT),
                SCORE_PANEL_ORIGIN,
            ),
        ];
        for (flag, layer, src, rect, at) in regions {
            if self.dirty.take(flag) {
                report.blit(backend, layer, src, rect, target, at);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::{Depth, PixelFormat};
    use crate::test_support::RecordingBackend;
    use crate::{HEIGHT, WIDTH};
    use std::vec;

    struct Scene {
        backend: RecordingBackend,
        registry: SurfaceRegistry,
        compositor: Compositor,
        target: OffscreenBuffer,
    }

    fn scene(depth: Depth) -> Scene {
        let mut backend = RecordingBackend::new(depth);
        let mut registry = SurfaceRegistry::new(PixelFormat::new(depth));
        let layers = LayerSet::create(&mut registry, &mut backend).unwrap();
        let target = OffscreenBuffer::new(WIDTH, HEIGHT, PixelFormat::new(depth)).unwrap();
        Scene { backend, registry, compositor: Compositor::new(layers), target }
    }

    impl Scene {
        fn compose(&mut self) -> ComposeReport {
            self.compositor.compose(&mut self.backend, &self.registry, &mut self.target)
        }

        fn fill(&mut self, layer: Layer, value: u32) {
            let handle = self.compositor.layers().handle(layer).unwrap();
            self.registry.get_mut(handle).unwrap().fill(value);
        }
    }

    #[test]
    fn test_first_frame_is_a_full_redraw_in_z_order() {
        let mut s = scene(Depth::Rgb16);
        let report = s.compose();
        assert_eq!(report.kind, ComposeKind::Full);
        assert_eq!(
            s.backend.take_blits(),
            vec![Layer::Viewport, Layer::Hud, Layer::OptionPanel, Layer::ScorePanel]
        );
    }

    #[test]
    fn test_full_redraw_clears_every_flag() {
        let mut s = scene(Depth::Rgb32);
        s.compose();
        let dirty = s.compositor.dirty_mut();
        dirty.mark(HudDirty::all());
        dirty.push_option_slot(0, 0);
        dirty.push_option_slot(28, 56);
        dirty.request_full_redraw();

        let report = s.compose();
        assert_eq!(report.kind, ComposeKind::Full);
        assert_eq!(report.blits, 4);
        assert!(s.compositor.dirty().is_clean());
        assert_eq!(s.compositor.dirty().pending_option_slots(), 0);
    }

    #[test]
    fn test_clean_incremental_frame_only_blits_viewport() {
        let mut s = scene(Depth::Indexed8);
        s.compose();
        s.backend.take_blits();

        let report = s.compose();
        assert_eq!(report.kind, ComposeKind::Incremental);
        assert_eq!(s.backend.take_blits(), vec![Layer::Viewport]);
    }

    #[test]
    fn test_each_hud_flag_is_taken_once() {
        let mut s = scene(Depth::Rgb16);
        s.compose();
        s.backend.take_blits();

        s.compositor.dirty_mut().mark(HudDirty::BOSS_ENERGY | HudDirty::MULTIPLIER_X4);
        s.compose();
        assert_eq!(
            s.backend.take_blits(),
            vec![Layer::Viewport, Layer::MultiplierX4, Layer::BossEnergy]
        );
        assert!(s.compositor.dirty().hud().is_empty());

        s.compose();
        assert_eq!(s.backend.take_blits(), vec![Layer::Viewport]);
    }

    #[test]
    fn test_option_slots_drain_last_in_first() {
        let mut s = scene(Depth::Rgb24);
        s.compose();
        s.backend.take_rects();

        s.compositor.dirty_mut().push_option_slot(0, 0);
        s.compositor.dirty_mut().push_option_slot(28, 28);
        s.compose();

        assert_eq!(
            s.backend.take_rects(),
            vec![
                (Layer::Viewport, Rect::new(128, 128, 256, 184), (0, 16)),
                (Layer::OptionSlot, Rect::new(28, 28, 28, 28), (284, 44)),
                (Layer::OptionSlot, Rect::new(0, 0, 28, 28), (256, 16)),
            ]
        );
        assert_eq!(s.compositor.dirty().pending_option_slots(), 0);
    }

    #[test]
    fn test_option_stack_overflow_forces_full_redraw() {
        let mut s = scene(Depth::Rgb16);
        s.compose();
        for i in 0..=OPTION_STACK_CAPACITY as i32 {
            s.compositor.dirty_mut().push_option_slot(0, i);
        }
        assert!(s.compositor.dirty().needs_full_redraw());
        assert_eq!(s.compose().kind, ComposeKind::Full);
    }

    #[test]
    fn test_failed_blit_is_skipped() {
        let mut s = scene(Depth::Rgb32);
        s.backend.failing_layers.push(Layer::Hud);
        let report = s.compose();
        assert_eq!(report.blits, 4);
        assert_eq!(report.failures, 1);
        assert_eq!(
            s.backend.take_blits(),
            vec![Layer::Viewport, Layer::Hud, Layer::OptionPanel, Layer::ScorePanel]
        );
        assert!(s.compositor.dirty().is_clean());
    }

    #[test]
    fn test_layers_land_at_their_screen_positions() {
        let mut s = scene(Depth::Rgb32);
        s.fill(Layer::Viewport, 0x0000ff);
        s.fill(Layer::Hud, 0x00ff00);
        s.fill(Layer::OptionPanel, 0xff0000);
        s.fill(Layer::ScorePanel, 0xffffff);
        s.compose();

        assert_eq!(s.target.get_pixel(0, 16), Some(0x0000ff));
        assert_eq!(s.target.get_pixel(255, 199), Some(0x0000ff));
        assert_eq!(s.target.get_pixel(256, 16), Some(0xff0000));
        assert_eq!(s.target.get_pixel(319, 199), Some(0xff0000));
        assert_eq!(s.target.get_pixel(0, 0), Some(0x00ff00));
        assert_eq!(s.target.get_pixel(67, 15), Some(0x00ff00));
        assert_eq!(s.target.get_pixel(68, 0), Some(0xffffff));
        assert_eq!(s.target.get_pixel(195, 15), Some(0xffffff));
        assert_eq!(s.target.get_pixel(196, 15), Some(0x00ff00));
    }

    #[test]
    fn test_multiplier_icons_come_from_the_option_panel() {
        let mut s = scene(Depth::Rgb16);
        s.compose();
        let options = s.compositor.layers().options;
        s.registry.get_mut(options).unwrap().fill_rect(MULTIPLIER_X2_RECT, 0xbeef);
        s.compositor.dirty_mut().mark(HudDirty::MULTIPLIER_X2);
        s.compose();
        assert_eq!(s.target.get_pixel(297, 187), Some(0xbeef));
        assert_eq!(s.target.get_pixel(310, 194), Some(0xbeef));
    }
}
