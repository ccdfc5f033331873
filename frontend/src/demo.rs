use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use manga_core::blit::Rect;
use manga_core::compositor::{
    BOSS_ENERGY_RECT, CLIP_MARGIN, MULTIPLIER_X2_RECT, MULTIPLIER_X4_RECT, OPTIONS_HEIGHT,
    OPTION_SLOT_SIZE, PLAYER_ENERGY_RECT, SCORE_PANEL_HEIGHT, SCORE_PANEL_WIDTH, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};
use manga_core::palette::{Palette, Rgb};
use manga_core::surface::OffscreenBuffer;
use manga_core::{Frame, HudDirty, Layer, LogicalKey, Simulation, HEIGHT, WIDTH};

/// Ticks the intro runs before it ends on its own, at the movie rate.
const INTRO_TICKS: u32 = 28 * 5;
const STAR_COUNT: usize = 48;
const SHIP_SIZE: (i32, i32) = (12, 10);
const SHIP_SPEED: i32 = 2;
const OPTION_SLOTS: [(i32, i32); 4] = [(18, 16), (18, 52), (18, 88), (18, 124)];
const SLOT_CYCLE_TICKS: u64 = 70;
const MAX_ENERGY: u32 = 100;
const SCORE_DIGITS: usize = 6;

/// 3x5 digit glyphs, one bit per pixel, top row first.
const DIGITS: [u16; 10] = [
    0b111_101_101_101_111,
    0b010_110_010_010_111,
    0b111_001_111_100_111,
    0b111_001_111_001_111,
    0b101_101_111_001_001,
    0b111_100_111_001_111,
    0b111_100_111_101_111,
    0b111_001_010_010_010,
    0b111_101_111_101_111,
    0b111_101_111_001_111,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scene {
    Intro,
    Playing,
}

#[derive(Copy, Clone, Debug)]
struct Star {
    x: i32,
    y: i32,
    speed: i32,
}

/// Pixel values for the colors the demo draws with.
#[derive(Copy, Clone, Debug)]
struct Ink {
    black: u32,
    white: u32,
    gray: u32,
    dark: u32,
    red: u32,
    green: u32,
    yellow: u32,
    cyan: u32,
}

/// Edge detector for a held key.
#[derive(Copy, Clone, Debug, Default)]
struct Latch(bool);

impl Latch {
    fn pressed(&mut self, down: bool) -> bool {
        let edge = down && !self.0;
        self.0 = down;
        edge
    }
}

fn intro_palette() -> Palette {
    let mut colors = [Rgb::BLACK; 256];
    for (i, color) in colors.iter_mut().enumerate() {
        let v = i as u8;
        *color = Rgb::new(v / 4, v / 2, v);
    }
    Palette::from_colors(colors)
}

fn draw_digit(buffer: &mut OffscreenBuffer, digit: usize, x: i32, y: i32, scale: i32, value: u32) {
    let glyph = DIGITS[digit % 10];
    for row in 0..5 {
        for col in 0..3 {
            if glyph & (1 << (14 - (row * 3 + col))) != 0 {
                buffer.fill_rect(Rect::new(x + col * scale, y + row * scale, scale as u32, scale as u32), value);
            }
        }
    }
}

fn draw_gauge(buffer: &mut OffscreenBuffer, area: Rect, level: u32, max: u32, ink: Ink, fill: u32) {
    buffer.fill_rect(area, ink.dark);
    let width = area.w * level.min(max) / max;
    if width > 0 {
        buffer.fill_rect(Rect::new(area.x, area.y, width, area.h), fill);
    }
}

/// A small attract-mode game: an intro cutscene, then a ship over a
/// starfield with a live score, gauges and option slots.
pub struct DemoGame {
    rng: SmallRng,
    scene: Scene,
    stars: Vec<Star>,
    ship: (i32, i32),
    score: u32,
    energy: u32,
    boss_energy: u32,
    multiplier: u32,
    slot: usize,
    ticks: u64,
    intro_ticks: u32,
    panels_drawn: bool,
    fullscreen: bool,
    fire: Latch,
    option: Latch,
    pause: Latch,
    fullscreen_key: Latch,
    frame_limit: Option<u64>,
}

impl DemoGame {
    pub fn new(seed: u64, frame_limit: Option<u64>) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let stars = (0..STAR_COUNT)
            .map(|_| Star {
                x: rng.gen_range(0..VIEWPORT_WIDTH as i32),
                y: rng.gen_range(0..VIEWPORT_HEIGHT as i32),
                speed: rng.gen_range(1..=3),
            })
            .collect();

        Self {
            rng,
            scene: Scene::Intro,
            stars,
            ship: (VIEWPORT_WIDTH as i32 / 2, VIEWPORT_HEIGHT as i32 - 24),
            score: 0,
            energy: MAX_ENERGY,
            boss_energy: BOSS_ENERGY_RECT.w,
            multiplier: 1,
            slot: 0,
            ticks: 0,
            intro_ticks: 0,
            panels_drawn: false,
            fullscreen: false,
            fire: Latch::default(),
            option: Latch::default(),
            pause: Latch::default(),
            fullscreen_key: Latch::default(),
            frame_limit,
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ship(&self) -> (i32, i32) {
        self.ship
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    fn ink(frame: &Frame<'_>) -> Ink {
        let tables = frame.render.tables();
        let rgb = |r, g, b| tables.encode_rgb(Rgb::new(r, g, b));
        Ink {
            black: rgb(0, 0, 0),
            white: rgb(255, 255, 255),
            gray: rgb(146, 146, 170),
            dark: rgb(36, 36, 85),
            red: rgb(255, 0, 0),
            green: rgb(0, 219, 0),
            yellow: rgb(255, 255, 0),
            cyan: rgb(0, 219, 255),
        }
    }

    fn run_intro(&mut self, frame: &mut Frame<'_>, fire: bool) {
        if !frame.render.is_movie_playing() {
            if self.intro_ticks > 0 || !frame.start_movie(&intro_palette()) {
                self.scene = Scene::Playing;
                return;
            }
            info!("intro started");
        }

        if fire || self.intro_ticks >= INTRO_TICKS {
            debug!("intro over after {} ticks", self.intro_ticks);
            frame.stop_movie();
            self.scene = Scene::Playing;
            return;
        }

        let t = self.intro_ticks as i32;
        if let Some(pixels) = frame.render.movie_frame_mut() {
            for (i, px) in pixels.iter_mut().enumerate() {
                let x = (i % WIDTH as usize) as i32 - WIDTH as i32 / 2;
                let y = (i / WIDTH as usize) as i32 - HEIGHT as i32 / 2;
                *px = ((x * x + y * y) / 48 - t * 4) as u8;
            }
        }
        self.intro_ticks += 1;
    }

    fn draw_option_slot(&self, options: &mut OffscreenBuffer, slot: usize, ink: Ink) {
        let (x, y) = OPTION_SLOTS[slot];
        let size = OPTION_SLOT_SIZE;
        let (edge, body) = if slot == self.slot { (ink.yellow, ink.gray) } else { (ink.gray, ink.dark) };
        options.fill_rect(Rect::new(x, y, size, size), edge);
        options.fill_rect(Rect::new(x + 2, y + 2, size - 4, size - 4), body);
    }

    fn draw_multipliers(&self, options: &mut OffscreenBuffer, ink: Ink) {
        let lit = |on: bool| if on { ink.red } else { ink.dark };
        options.fill_rect(MULTIPLIER_X2_RECT, lit(self.multiplier == 2));
        options.fill_rect(MULTIPLIER_X4_RECT, lit(self.multiplier == 4));
    }

    fn draw_score(&self, score: &mut OffscreenBuffer, ink: Ink) {
        score.fill(ink.black);
        let mut value = self.score;
        let mut digits = [0usize; SCORE_DIGITS];
        for digit in digits.iter_mut().rev() {
            *digit = (value % 10) as usize;
            value /= 10;
        }
        let scale = 2;
        let y = (SCORE_PANEL_HEIGHT as i32 - 5 * scale) / 2;
        let x0 = (SCORE_PANEL_WIDTH as i32 - SCORE_DIGITS as i32 * 4 * scale) / 2;
        for (i, digit) in digits.into_iter().enumerate() {
            draw_digit(score, digit, x0 + i as i32 * 4 * scale, y, scale, ink.white);
        }
    }

    /// Paints every static panel once; the compositor copies them on the
    /// next full redraw.
    fn draw_panels(&mut self, frame: &mut Frame<'_>, ink: Ink) {
        if let Some(hud) = frame.render.layer_mut(Layer::Hud) {
            hud.fill(ink.black);
            hud.fill_rect(Rect::new(0, 15, WIDTH, 1), ink.gray);
            draw_gauge(hud, PLAYER_ENERGY_RECT, self.energy, MAX_ENERGY, ink, ink.green);
            draw_gauge(hud, BOSS_ENERGY_RECT, self.boss_energy, BOSS_ENERGY_RECT.w, ink, ink.red);
        }
        if let Some(options) = frame.render.layer_mut(Layer::OptionPanel) {
            options.fill(ink.black);
            options.fill_rect(Rect::new(0, 0, 1, OPTIONS_HEIGHT), ink.gray);
            for slot in 0..OPTION_SLOTS.len() {
                self.draw_option_slot(options, slot, ink);
            }
            self.draw_multipliers(options, ink);
        }
        if let Some(score) = frame.render.layer_mut(Layer::ScorePanel) {
            self.draw_score(score, ink);
        }
        frame.render.dirty_mut().request_full_redraw();
        self.panels_drawn = true;
    }

    fn move_ship(&mut self, frame: &Frame<'_>) {
        let input = &*frame.input;
        let (mut x, mut y) = self.ship;
        if input.left() {
            x -= SHIP_SPEED;
        }
        if input.right() {
            x += SHIP_SPEED;
        }
        if input.up() {
            y -= SHIP_SPEED;
        }
        if input.down() {
            y += SHIP_SPEED;
        }
        if input.mouse.pressed {
            x = input.mouse.x.min(VIEWPORT_WIDTH as i32 - 1);
            y = (input.mouse.y - VIEWPORT_HEIGHT as i32 / 10).max(0);
        }
        self.ship = (
            x.clamp(0, VIEWPORT_WIDTH as i32 - SHIP_SIZE.0),
            y.clamp(0, VIEWPORT_HEIGHT as i32 - SHIP_SIZE.1),
        );
    }

    fn draw_viewport(&mut self, frame: &mut Frame<'_>, ink: Ink) {
        frame.render.clear_viewport();
        let Some(viewport) = frame.render.layer_mut(Layer::Viewport) else {
            return;
        };

        for star in self.stars.iter_mut() {
            star.y += star.speed;
            if star.y >= VIEWPORT_HEIGHT as i32 {
                star.y = 0;
                star.x = self.rng.gen_range(0..VIEWPORT_WIDTH as i32);
            }
            let color = if star.speed > 2 { ink.white } else { ink.gray };
            viewport.put_pixel(CLIP_MARGIN + star.x, CLIP_MARGIN + star.y, color);
        }

        let (x, y) = (CLIP_MARGIN + self.ship.0, CLIP_MARGIN + self.ship.1);
        viewport.fill_rect(Rect::new(x, y + 4, SHIP_SIZE.0 as u32, 6), ink.cyan);
        viewport.fill_rect(Rect::new(x + 4, y, 4, SHIP_SIZE.1 as u32), ink.white);
    }

    fn play(&mut self, frame: &mut Frame<'_>, fire: bool, option: bool) {
        let ink = Self::ink(frame);
        if !self.panels_drawn {
            self.draw_panels(frame, ink);
        }
        if frame.input.pause.is_paused() {
            return;
        }

        self.move_ship(frame);
        self.draw_viewport(frame, ink);

        let mut dirty = HudDirty::empty();

        if frame.input.fire() && (fire || self.ticks % 4 == 0) {
            self.score = (self.score + 10 * self.multiplier) % 1_000_000;
            if let Some(score) = frame.render.layer_mut(Layer::ScorePanel) {
                self.draw_score(score, ink);
            }
            dirty |= HudDirty::SCORE_DIGITS;
        }

        if option {
            self.multiplier = match self.multiplier {
                1 => 2,
                2 => 4,
                _ => 1,
            };
            if let Some(options) = frame.render.layer_mut(Layer::OptionPanel) {
                self.draw_multipliers(options, ink);
            }
            dirty |= HudDirty::MULTIPLIER_X2 | HudDirty::MULTIPLIER_X4;
        }

        if self.ticks % 70 == 0 {
            self.energy = if self.energy == 0 { MAX_ENERGY } else { self.energy - 1 };
            if let Some(hud) = frame.render.layer_mut(Layer::Hud) {
                draw_gauge(hud, PLAYER_ENERGY_RECT, self.energy, MAX_ENERGY, ink, ink.green);
            }
            dirty |= HudDirty::PLAYER_ENERGY;
        }

        if self.ticks % 10 == 0 {
            self.boss_energy = if self.boss_energy == 0 { BOSS_ENERGY_RECT.w } else { self.boss_energy - 1 };
            if let Some(hud) = frame.render.layer_mut(Layer::Hud) {
                draw_gauge(hud, BOSS_ENERGY_RECT, self.boss_energy, BOSS_ENERGY_RECT.w, ink, ink.red);
            }
            dirty |= HudDirty::BOSS_ENERGY;
        }

        if self.ticks % SLOT_CYCLE_TICKS == 0 {
            let previous = self.slot;
            self.slot = (self.slot + 1) % OPTION_SLOTS.len();
            if let Some(options) = frame.render.layer_mut(Layer::OptionPanel) {
                self.draw_option_slot(options, previous, ink);
                self.draw_option_slot(options, self.slot, ink);
            }
            let dirty_state = frame.render.dirty_mut();
            for slot in [previous, self.slot] {
                let (x, y) = OPTION_SLOTS[slot];
                dirty_state.push_option_slot(x, y);
            }
        }

        frame.render.dirty_mut().mark(dirty);
    }
}

impl Simulation for DemoGame {
    fn update_frame(&mut self, frame: &mut Frame<'_>) -> bool {
        self.ticks += 1;
        if self.frame_limit.is_some_and(|limit| self.ticks >= limit) {
            info!("frame limit reached");
            return false;
        }

        let keys = &frame.input.keys;
        if keys.is_down(LogicalKey::Escape) {
            info!("escape pressed, leaving");
            return false;
        }

        if self.ticks == 1 {
            self.fullscreen = frame.settings.fullscreen;
        }
        if self.fullscreen_key.pressed(keys.is_down(LogicalKey::F4)) {
            self.fullscreen = !self.fullscreen;
            frame.render.request_fullscreen(self.fullscreen);
        }
        let pause_down = keys.is_down(LogicalKey::P) || keys.is_down(LogicalKey::F12) || keys.is_down(LogicalKey::Pause);
        if self.pause.pressed(pause_down) {
            let paused = frame.input.pause.toggle();
            info!("paused: {}", paused);
        }

        let fire = self.fire.pressed(frame.input.fire());
        let option = self.option.pressed(frame.input.option());

        match self.scene {
            Scene::Intro => self.run_intro(frame, fire),
            Scene::Playing => self.play(frame, fire, option),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manga_core::backend::headless::HeadlessBackend;
    use manga_core::compositor::OPTIONS_ORIGIN;
    use manga_core::{Depth, MainLoop, PlatformEvent, RenderContext, Scancode, Settings, TextureFormat, TimeDaemon};

    #[derive(Default)]
    struct StillClock;

    impl TimeDaemon for StillClock {
        fn get_now_ms(&self) -> f64 {
            0.0
        }
    }

    fn setup(depth: Depth, frame_limit: Option<u64>) -> (HeadlessBackend, MainLoop<StillClock, DemoGame>) {
        let mut backend = HeadlessBackend::new(TextureFormat::of(depth));
        let render = RenderContext::init(&mut backend, &Palette::default()).unwrap();
        let settings = Settings { nosync: true, ..Settings::default() };
        let main_loop = MainLoop::new(render, settings, StillClock, DemoGame::new(7, frame_limit));
        (backend, main_loop)
    }

    #[test]
    fn test_intro_plays_then_gives_way() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb16, None);
        assert!(main_loop.step(&mut backend));
        assert_eq!(main_loop.game().scene(), Scene::Intro);
        assert!(main_loop.render().is_movie_playing());

        for _ in 0..INTRO_TICKS + 1 {
            assert!(main_loop.step(&mut backend));
        }
        assert_eq!(main_loop.game().scene(), Scene::Playing);
        assert!(!main_loop.render().is_movie_playing());
    }

    #[test]
    fn test_fire_skips_the_intro() {
        let (mut backend, mut main_loop) = setup(Depth::Indexed8, None);
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyDown(Scancode::Space));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().scene(), Scene::Playing);
    }

    #[test]
    fn test_escape_quits() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb32, None);
        backend.push_event(PlatformEvent::KeyDown(Scancode::Escape));
        assert!(main_loop.step(&mut backend));
        assert!(!main_loop.step(&mut backend));
        assert!(main_loop.is_quit());
    }

    #[test]
    fn test_frame_limit_ends_the_run() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb15, Some(5));
        main_loop.run(&mut backend);
        assert_eq!(backend.frames_presented(), 5);
        assert!(main_loop.render().is_released());
    }

    #[test]
    fn test_firing_scores_and_draws_the_panels() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb32, None);
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyDown(Scancode::Space));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().scene(), Scene::Playing);

        for _ in 0..8 {
            main_loop.step(&mut backend);
        }
        assert!(main_loop.game().score() > 0);

        let screen = main_loop.render().screen();
        let black = main_loop.render().tables().encode_rgb(Rgb::BLACK);
        let slot = OPTION_SLOTS[0];
        assert_ne!(screen.get_pixel(OPTIONS_ORIGIN.0 + slot.0, OPTIONS_ORIGIN.1 + slot.1), Some(black));
        assert_ne!(
            screen.get_pixel(PLAYER_ENERGY_RECT.x, PLAYER_ENERGY_RECT.y),
            Some(black)
        );
    }

    #[test]
    fn test_ship_follows_the_keys() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb16, None);
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyDown(Scancode::Space));
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyUp(Scancode::Space));
        main_loop.step(&mut backend);

        let start = main_loop.game().ship();
        backend.push_event(PlatformEvent::KeyDown(Scancode::Left));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().ship().0, start.0 - SHIP_SPEED);
    }

    #[test]
    fn test_option_cycles_the_multiplier() {
        let (mut backend, mut main_loop) = setup(Depth::Rgb16, None);
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyDown(Scancode::Space));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().multiplier(), 1);

        backend.push_event(PlatformEvent::KeyDown(Scancode::LeftCtrl));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().multiplier(), 2);

        backend.push_event(PlatformEvent::KeyUp(Scancode::LeftCtrl));
        main_loop.step(&mut backend);
        backend.push_event(PlatformEvent::KeyDown(Scancode::RightCtrl));
        main_loop.step(&mut backend);
        main_loop.step(&mut backend);
        assert_eq!(main_loop.game().multiplier(), 4);
    }

    #[test]
    fn test_digits_render() {
        let mut buffer = OffscreenBuffer::new(8, 8, manga_core::PixelFormat::new(Depth::Indexed8)).unwrap();
        draw_digit(&mut buffer, 1, 0, 0, 1, 9);
        assert_eq!(buffer.get_pixel(1, 0), Some(9));
        assert_eq!(buffer.get_pixel(0, 0), Some(0));
        assert_eq!(buffer.get_pixel(0, 4), Some(9));
    }

    #[test]
    fn test_latch_fires_once_per_press() {
        let mut latch = Latch::default();
        assert!(latch.pressed(true));
        assert!(!latch.pressed(true));
        assert!(!latch.pressed(false));
        assert!(latch.pressed(true));
    }
}
