use std::time::{Duration, Instant};
use tracing::{info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::WindowId;
use manga_core::MainLoop;
use crate::app_delegation::InstantClock;
use crate::backend::WinitBackend;
use crate::demo::DemoGame;

/// The running game: winit wakes it at every tick deadline, it steps the
/// main loop and sleeps until the next one.
pub struct AppInitialized {
    pub main_loop: MainLoop<InstantClock, DemoGame>,
    pub backend: WinitBackend,

    next_tick: Instant,
    suspended: bool,
}

impl AppInitialized {
    pub fn new(main_loop: MainLoop<InstantClock, DemoGame>, backend: WinitBackend) -> Self {
        Self {
            main_loop,
            backend,
            next_tick: Instant::now(),
            suspended: false,
        }
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        if Instant::now() >= self.next_tick {
            if !self.main_loop.step(&mut self.backend) {
                self.main_loop.teardown(&mut self.backend);
                event_loop.exit();
                return;
            }
            let delay = self.main_loop.frame_delay_ms();
            self.next_tick = Instant::now() + Duration::from_secs_f64(delay.max(0.0) / 1000.0);
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }
}

impl ApplicationHandler for AppInitialized {
    fn resumed(&mut self, _: &ActiveEventLoop) {
        if self.suspended {
            info!("resumed");
            self.main_loop.resume();
            self.next_tick = Instant::now();
            self.suspended = false;
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        self.backend.handle_window_event(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.suspended {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        self.tick(event_loop);
    }

    fn suspended(&mut self, _: &ActiveEventLoop) {
        warn!("suspended");
        self.suspended = true;
    }

    fn exiting(&mut self, _: &ActiveEventLoop) {
        self.main_loop.teardown(&mut self.backend);
    }
}
