use alloc::boxed::Box;
use log::{debug, info};
use crate::backend::DisplayBackend;
use crate::input::{EventResponse, InputState, InputTranslator};
use crate::pacer::{FramePacer, TickMode, TimeDaemon};
use crate::palette::Palette;
use crate::render::RenderContext;
use crate::settings::Settings;

/// What a tick hands the game logic.
pub struct Frame<'a> {
    pub render: &'a mut RenderContext,
    pub input: &'a mut InputState,
    pub settings: &'a Settings,
    pub backend: &'a mut dyn DisplayBackend,
}

impl Frame<'_> {
    pub fn start_movie(&mut self, palette: &Palette) -> bool {
        self.render.start_movie(&mut *self.backend, palette)
    }

    pub fn stop_movie(&mut self) -> bool {
        self.render.stop_movie()
    }
}

pub trait Simulation {
    /// Advances the game by one tick. Returning false ends the loop.
    fn update_frame(&mut self, frame: &mut Frame<'_>) -> bool;
}

pub trait AudioService {
    fn service(&mut self);
}

/// The fixed-rate loop: simulate, handle input, compose and present, then
/// feed the audio.
pub struct MainLoop<Clock: TimeDaemon, Game: Simulation> {
    render: RenderContext,
    input: InputState,
    translator: InputTranslator,
    settings: Settings,
    pacer: FramePacer<Clock>,
    game: Game,
    audio: Option<Box<dyn AudioService>>,
    quit: bool,
    torn_down: bool,
    loops_counter: u64,
    started_ms: f64,
}

impl<Clock: TimeDaemon, Game: Simulation> MainLoop<Clock, Game> {
    pub fn new(mut render: RenderContext, settings: Settings, clock: Clock, game: Game) -> Self {
        if settings.fullscreen {
            render.request_fullscreen(true);
        }
        let pacer = FramePacer::new(clock, settings.nosync);
        let started_ms = pacer.now_ms();
        Self {
            render,
            input: InputState::default(),
            translator: InputTranslator::new(&settings),
            settings,
            pacer,
            game,
            audio: None,
            quit: false,
            torn_down: false,
            loops_counter: 0,
            started_ms,
        }
    }

    /// Ignored when sound is switched off.
    pub fn with_audio(mut self, audio: Box<dyn AudioService>) -> Self {
        if !self.settings.nosound {
            self.audio = Some(audio);
        }
        self
    }

    pub fn render(&self) -> &RenderContext {
        &self.render
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tick_mode(&self) -> TickMode {
        if self.render.is_movie_playing() {
            TickMode::Movie
        } else {
            TickMode::Gameplay
        }
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn loops_counter(&self) -> u64 {
        self.loops_counter
    }

    pub fn average_fps(&self) -> f64 {
        let seconds = (self.pacer.now_ms() - self.started_ms) / 1000.0;
        if seconds <= 0.0 {
            return 0.0;
        }
        self.loops_counter as f64 / seconds
    }

    /// Delay until the next tick is due, for event loops that schedule their
    /// own wakeups.
    pub fn frame_delay_ms(&mut self) -> f64 {
        let mode = self.tick_mode();
        self.pacer.next_delay(mode)
    }

    /// Restarts pacing after the loop was suspended.
    pub fn resume(&mut self) {
        self.pacer.resume();
    }

    /// Runs one tick. Returns false once the loop should stop.
    pub fn step(&mut self, backend: &mut dyn DisplayBackend) -> bool {
        if self.quit {
            return false;
        }
        self.loops_counter += 1;

        let mut frame = Frame {
            render: &mut self.render,
            input: &mut self.input,
            settings: &self.settings,
            backend: &mut *backend,
        };
        if !self.game.update_frame(&mut frame) {
            info!("simulation asked to quit");
            self.quit = true;
        }

        if let Some(fullscreen) = self.render.take_fullscreen_request() {
            debug!("fullscreen: {}", fullscreen);
            backend.set_fullscreen(fullscreen);
        }

        while let Some(event) = backend.poll_event() {
            match self.translator.translate(&event, &mut self.input) {
                EventResponse::None => {}
                EventResponse::Redraw => self.render.invalidate(),
                EventResponse::Quit => self.quit = true,
            }
        }

        self.render.compose(backend);

        if let Some(audio) = self.audio.as_mut() {
            audio.service();
        }

        !self.quit
    }

    /// Paces and steps until something asks to quit, then tears down.
    pub fn run(&mut self, backend: &mut dyn DisplayBackend) {
        info!("main loop started");
        loop {
            let mode = self.tick_mode();
            self.pacer.wait_next_frame(mode);
            if !self.step(backend) {
                break;
            }
        }
        self.teardown(backend);
    }

    /// Frees every buffer and closes the backend. Runs once.
    pub fn teardown(&mut self, backend: &mut dyn DisplayBackend) {
        if self.torn_down {
            return;
        }
        self.render.release();
        backend.close_joysticks();
        backend.shutdown();
        self.torn_down = true;
        info!(
            "number of loops: {}; average frames per second: {:.1}",
            self.loops_counter,
            self.average_fps()
        );
    }
}
