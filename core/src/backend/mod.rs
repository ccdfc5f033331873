pub mod headless;

use crate::blit::{self, Rect};
use crate::compositor::Layer;
use crate::error::{DisplayError, SurfaceError};
use crate::input::PlatformEvent;
use crate::pixel_format::{PixelFormat, TextureFormat};
use crate::surface::OffscreenBuffer;

/// Everything the core needs from a window system.
///
/// Only `texture_format`, `present` and `poll_event` are mandatory; surfaces
/// and blits default to the software implementation, and a backend without
/// joysticks or a fullscreen mode can ignore those calls.
pub trait DisplayBackend {
    /// Best pixel layout the backend can upload.
    fn texture_format(&self) -> Result<TextureFormat, DisplayError>;

    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<OffscreenBuffer, SurfaceError> {
        OffscreenBuffer::new(width, height, format)
    }

    /// Copies `src_rect` of `src` into `dst`. `layer` names what is being
    /// drawn.
    fn blit(
        &mut self,
        layer: Layer,
        src: &OffscreenBuffer,
        src_rect: Rect,
        dst: &mut OffscreenBuffer,
        dst_x: i32,
        dst_y: i32,
    ) -> Result<(), DisplayError> {
        let _ = layer;
        blit::copy_rect(src, src_rect, dst, dst_x, dst_y)
    }

    /// Shows a finished frame.
    fn present(&mut self, frame: &OffscreenBuffer) -> Result<(), DisplayError>;

    /// Next pending platform event, `None` once the queue is drained.
    fn poll_event(&mut self) -> Option<PlatformEvent>;

    /// Opens every attached joystick, returning how many were found.
    fn open_joysticks(&mut self) -> Result<usize, DisplayError> {
        Ok(0)
    }

    fn close_joysticks(&mut self) {}

    fn set_fullscreen(&mut self, fullscreen: bool) {
        let _ = fullscreen;
    }

    /// Releases window system resources. Called once, after every buffer is
    /// gone.
    fn shutdown(&mut self) {}
}
