use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId};
use manga_core::{Depth, MainLoop, Palette, RenderContext, Settings, HEIGHT, WIDTH};
use crate::app_delegation::InstantClock;
use crate::app_initialized::AppInitialized;
use crate::backend::WinitBackend;
use crate::demo::DemoGame;
use crate::egui_renderer::EguiRenderer;
use crate::graphics::GraphicsContext;

/// Window and graphics setup, before the game can run.
pub struct App {
    pub settings: Settings,
    pub depth: Option<Depth>,
    pub frame_limit: Option<u64>,

    pub gc: Option<GraphicsContext>,
    pub window: Option<Arc<Window>>,
    pub egui_renderer: Option<EguiRenderer>,

    pub app_initialized: Option<AppInitialized>,
}

impl App {
    pub fn new(settings: Settings, depth: Option<Depth>, frame_limit: Option<u64>) -> Self {
        Self {
            settings,
            depth,
            frame_limit,
            gc: None,
            window: None,
            egui_renderer: None,
            app_initialized: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        info!("initializing...");
        let window_attributes = WindowAttributes::default()
            .with_title("Mangadualist")
            .with_inner_size(LogicalSize::new(WIDTH * 2, HEIGHT * 2))
            .with_min_inner_size(LogicalSize::new(WIDTH, HEIGHT));

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        self.window = Some(window.clone());

        let gc = pollster::block_on(GraphicsContext::new(window.clone()))?;
        let fmt = gc.surface_config.format;
        self.egui_renderer = Some(EguiRenderer::new(&gc.device, fmt, None, 1, &window));
        self.gc = Some(gc);

        info!("adapter has been set up");
        Ok(())
    }

    /// Builds the display, the game loop and the running app out of the
    /// window parts.
    fn start(&mut self) -> anyhow::Result<AppInitialized> {
        let (Some(gc), Some(window), Some(egui_renderer)) =
            (self.gc.take(), self.window.take(), self.egui_renderer.take())
        else {
            anyhow::bail!("window isn't ready");
        };

        let mut backend = WinitBackend::new(gc, window, egui_renderer, self.depth);
        let render = RenderContext::init(&mut backend, &Palette::default())?;
        let clock = InstantClock { instant: Instant::now() };
        let seed = clock.instant.elapsed().as_nanos() as u64 ^ 0x6d61_6e67_6164_7561;
        let game = DemoGame::new(seed, self.frame_limit);
        let main_loop = MainLoop::new(render, self.settings, clock, game);

        Ok(AppInitialized::new(main_loop, backend))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_window(event_loop) {
            error!("couldn't open the window: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        if let (Some(renderer), Some(window)) = (self.egui_renderer.as_mut(), self.window.as_ref()) {
            renderer.handle_input(window, &event);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.gc.is_none() || self.egui_renderer.is_none() || self.window.is_none() {
            return;
        }

        match self.start() {
            Ok(app_init) => {
                info!("initialized app");
                app_init.backend.window.request_redraw();
                self.app_initialized = Some(app_init);
            }
            Err(e) => {
                error!("couldn't start the display: {:#}", e);
                event_loop.exit();
            }
        }
    }
}
