use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use egui::{pos2, Color32, ColorImage, Rect, TextureHandle, TextureOptions};
use egui_wgpu::ScreenDescriptor;
use tracing::{debug, info, warn};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window};
use manga_core::input::{MouseButton, Scancode};
use manga_core::palette::decode_with;
use manga_core::surface::OffscreenBuffer;
use manga_core::{Depth, DisplayBackend, DisplayError, PlatformEvent, TextureFormat, HEIGHT, WIDTH};
use crate::egui_renderer::EguiRenderer;
use crate::graphics::GraphicsContext;
#[cfg(feature = "gamepad")]
use crate::gamepad::Gamepads;

/// Shows frames in a winit window through egui, and queues the window's
/// input as platform events.
pub struct WinitBackend {
    pub gc: GraphicsContext,
    pub window: Arc<Window>,
    pub egui_renderer: EguiRenderer,

    depth: Depth,
    screen: Option<TextureHandle>,
    /// Where the last frame landed, in egui points.
    image_rect: Rect,
    cursor: PhysicalPosition<f64>,
    bindings: HashMap<KeyCode, Scancode>,
    events: VecDeque<PlatformEvent>,

    #[cfg(feature = "gamepad")]
    gamepads: Option<Gamepads>,
}

pub fn default_bindings() -> HashMap<KeyCode, Scancode> {
    use Scancode::*;
    let letters = [
        (KeyCode::KeyA, A), (KeyCode::KeyB, B), (KeyCode::KeyC, C), (KeyCode::KeyD, D),
        (KeyCode::KeyE, E), (KeyCode::KeyF, F), (KeyCode::KeyG, G), (KeyCode::KeyH, H),
        (KeyCode::KeyI, I), (KeyCode::KeyJ, J), (KeyCode::KeyK, K), (KeyCode::KeyL, L),
        (KeyCode::KeyM, M), (KeyCode::KeyN, N), (KeyCode::KeyO, O), (KeyCode::KeyP, P),
        (KeyCode::KeyQ, Q), (KeyCode::KeyR, R), (KeyCode::KeyS, S), (KeyCode::KeyT, T),
        (KeyCode::KeyU, U), (KeyCode::KeyV, V), (KeyCode::KeyW, W), (KeyCode::KeyX, X),
        (KeyCode::KeyY, Y), (KeyCode::KeyZ, Z),
    ];
    let digits = [
        (KeyCode::Digit0, Num0), (KeyCode::Digit1, Num1), (KeyCode::Digit2, Num2), (KeyCode::Digit3, Num3),
        (KeyCode::Digit4, Num4), (KeyCode::Digit5, Num5), (KeyCode::Digit6, Num6), (KeyCode::Digit7, Num7),
        (KeyCode::Digit8, Num8), (KeyCode::Digit9, Num9),
        (KeyCode::Numpad0, Kp0), (KeyCode::Numpad1, Kp1), (KeyCode::Numpad2, Kp2), (KeyCode::Numpad3, Kp3),
        (KeyCode::Numpad4, Kp4), (KeyCode::Numpad5, Kp5), (KeyCode::Numpad6, Kp6), (KeyCode::Numpad7, Kp7),
        (KeyCode::Numpad8, Kp8), (KeyCode::Numpad9, Kp9),
    ];
    let function = [
        (KeyCode::F1, F1), (KeyCode::F2, F2), (KeyCode::F3, F3), (KeyCode::F4, F4),
        (KeyCode::F5, F5), (KeyCode::F6, F6), (KeyCode::F7, F7), (KeyCode::F8, F8),
        (KeyCode::F9, F9), (KeyCode::F10, F10), (KeyCode::F11, F11), (KeyCode::F12, F12),
    ];
    let named = [
        (KeyCode::Escape, Escape),
        (KeyCode::ControlLeft, LeftCtrl),
        (KeyCode::ControlRight, RightCtrl),
        (KeyCode::ShiftLeft, LeftShift),
        (KeyCode::ShiftRight, RightShift),
        (KeyCode::Enter, Return),
        (KeyCode::NumpadEnter, Return),
        (KeyCode::Pause, Pause),
        (KeyCode::Insert, Insert),
        (KeyCode::Space, Space),
        (KeyCode::ArrowLeft, Left),
        (KeyCode::ArrowRight, Right),
        (KeyCode::ArrowUp, Up),
        (KeyCode::ArrowDown, Down),
        (KeyCode::PageUp, PageUp),
        (KeyCode::PageDown, PageDown),
    ];

    letters
        .into_iter()
        .chain(digits)
        .chain(function)
        .chain(named)
        .collect()
}

fn mouse_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Back => MouseButton::Other(3),
        winit::event::MouseButton::Forward => MouseButton::Other(4),
        winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

/// Largest rect with the game's aspect ratio centered in `available`.
pub fn fit_rect(available: Rect) -> Rect {
    let scale = (available.width() / WIDTH as f32).min(available.height() / HEIGHT as f32);
    let scale = if scale >= 1.0 { scale.floor() } else { scale.max(f32::EPSILON) };
    Rect::from_center_size(available.center(), egui::vec2(WIDTH as f32 * scale, HEIGHT as f32 * scale))
}

/// Maps a physical cursor position to game pixels, clamped to the screen.
pub fn cursor_to_screen(cursor: PhysicalPosition<f64>, scale_factor: f64, image_rect: Rect) -> (i32, i32) {
    if image_rect.width() <= 0.0 || image_rect.height() <= 0.0 {
        return (0, 0);
    }
    let x = (cursor.x / scale_factor) as f32;
    let y = (cursor.y / scale_factor) as f32;
    let gx = (x - image_rect.min.x) / image_rect.width() * WIDTH as f32;
    let gy = (y - image_rect.min.y) / image_rect.height() * HEIGHT as f32;
    (
        (gx.floor() as i32).clamp(0, WIDTH as i32 - 1),
        (gy.floor() as i32).clamp(0, HEIGHT as i32 - 1),
    )
}

/// Decodes a composed frame into an egui image.
pub fn frame_to_image(frame: &OffscreenBuffer) -> ColorImage {
    let format = frame.format();
    let depth = format.depth();
    let bpp = format.bytes_per_pixel();
    let (width, height) = (frame.width() as usize, frame.height() as usize);

    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..frame.height() {
        for px in frame.row(y).chunks_exact(bpp).take(width) {
            let color = decode_with(depth, format.load(px), frame.palette());
            pixels.push(Color32::from_rgb(color.r, color.g, color.b));
        }
    }

    ColorImage { size: [width, height], pixels }
}

impl WinitBackend {
    pub fn new(gc: GraphicsContext, window: Arc<Window>, egui_renderer: EguiRenderer, depth: Option<Depth>) -> Self {
        let depth = depth.unwrap_or(Depth::Rgb32);
        info!("window backend drawing at {} bits per pixel", depth.bits());
        Self {
            gc,
            window,
            egui_renderer,
            depth,
            screen: None,
            image_rect: Rect::NOTHING,
            cursor: PhysicalPosition::new(0.0, 0.0),
            bindings: default_bindings(),
            events: VecDeque::new(),
            #[cfg(feature = "gamepad")]
            gamepads: None,
        }
    }

    fn mouse_position(&self) -> (i32, i32) {
        cursor_to_screen(self.cursor, self.window.scale_factor(), self.image_rect)
    }

    /// Queues whatever the game cares about in a window event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if self.egui_renderer.handle_input(&self.window, event) {
            debug!("egui consumed {:?}", event);
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("the close button was pressed");
                self.events.push_back(PlatformEvent::Quit);
            }
            WindowEvent::Resized(size) => {
                self.gc.resize(size.width, size.height);
                self.events.push_back(PlatformEvent::Exposed);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    warn!("{}", e);
                }
            }
            WindowEvent::Occluded(false) => self.events.push_back(PlatformEvent::Exposed),
            WindowEvent::Focused(true) => self.events.push_back(PlatformEvent::FocusGained),
            WindowEvent::Focused(false) => self.events.push_back(PlatformEvent::FocusLost),
            WindowEvent::KeyboardInput { event, .. } => {
                let KeyEvent { physical_key, state, repeat, .. } = event;
                if *repeat {
                    return;
                }
                let PhysicalKey::Code(code) = physical_key else {
                    debug!("unidentified key {:?}", physical_key);
                    return;
                };
                match self.bindings.get(code).copied() {
                    Some(key) if *state == ElementState::Pressed => self.events.push_back(PlatformEvent::KeyDown(key)),
                    Some(key) => self.events.push_back(PlatformEvent::KeyUp(key)),
                    None => debug!("unbound key {:?}", code),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                let (x, y) = self.mouse_position();
                self.events.push_back(PlatformEvent::MouseMotion { x, y });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = mouse_button(*button);
                let event = match state {
                    ElementState::Pressed => {
                        let (x, y) = self.mouse_position();
                        PlatformEvent::MouseButtonDown { button, x, y }
                    }
                    ElementState::Released => PlatformEvent::MouseButtonUp { button },
                };
                self.events.push_back(event);
            }
            WindowEvent::DroppedFile(path) => {
                info!("ignoring dropped file {}", path.display());
            }
            _ => (),
        }
    }

    /// Draws the current frame texture into the window.
    pub fn redraw(&mut self) -> Result<(), DisplayError> {
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [self.gc.surface_config.width, self.gc.surface_config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let surface_texture = match self.gc.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.gc.resize(size.width, size.height);
                return Err(DisplayError::Present("surface lost, reconfigured".to_string()));
            }
            Err(e) => return Err(DisplayError::Present(e.to_string())),
        };

        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.gc
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        self.egui_renderer.begin_frame(&self.window);
        let frame = egui::Frame {
            inner_margin: egui::Margin::same(0),
            outer_margin: egui::Margin::same(0),
            fill: Color32::BLACK,
            ..Default::default()
        };

        let mut image_rect = self.image_rect;
        egui::CentralPanel::default().frame(frame).show(self.egui_renderer.context(), |ui| {
            if let Some(screen) = self.screen.as_ref() {
                image_rect = fit_rect(ui.max_rect());
                ui.painter().image(
                    screen.id(),
                    image_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        });
        self.image_rect = image_rect;

        self.egui_renderer.end_frame_and_draw(
            &self.gc.device,
            &self.gc.queue,
            &mut encoder,
            &self.window,
            &surface_view,
            screen_descriptor,
        );

        self.gc.queue.submit(Some(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}

impl DisplayBackend for WinitBackend {
    fn texture_format(&self) -> Result<TextureFormat, DisplayError> {
        Ok(TextureFormat::of(self.depth))
    }

    fn present(&mut self, frame: &OffscreenBuffer) -> Result<(), DisplayError> {
        let image = frame_to_image(frame);
        match self.screen.as_mut() {
            Some(screen) => screen.set(image, TextureOptions::NEAREST),
            None => {
                let screen = self.egui_renderer.context().load_texture("screen", image, TextureOptions::NEAREST);
                self.screen = Some(screen);
            }
        }
        self.redraw()
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        #[cfg(feature = "gamepad")]
        {
            if self.events.is_empty() {
                if let Some(gamepads) = self.gamepads.as_mut() {
                    gamepads.poll(&mut self.events);
                }
            }
        }
        self.events.pop_front()
    }

    #[cfg(feature = "gamepad")]
    fn open_joysticks(&mut self) -> Result<usize, DisplayError> {
        let (gamepads, count) = Gamepads::open()?;
        self.gamepads = Some(gamepads);
        Ok(count)
    }

    #[cfg(feature = "gamepad")]
    fn close_joysticks(&mut self) {
        self.gamepads = None;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        let mode = fullscreen.then_some(Fullscreen::Borderless(None));
        self.window.set_fullscreen(mode);
    }

    fn shutdown(&mut self) {
        self.screen = None;
        self.events.clear();
        info!("window backend shut down");
    }
}
