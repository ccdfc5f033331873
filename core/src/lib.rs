#![cfg_attr(not(test), no_std)]
#![allow(clippy::new_without_default)]
extern crate alloc;

pub mod backend;
pub mod blit;
pub mod compositor;
pub mod error;
pub mod input;
pub mod main_loop;
pub mod movie;
pub mod pacer;
pub mod palette;
pub mod pixel_format;
pub mod render;
pub mod settings;
pub mod surface;

#[cfg(test)]
mod test_support;

/// Logical display size; every frame is composed at this resolution.
pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 200;

pub use backend::DisplayBackend;
pub use compositor::{ComposeKind, ComposeReport, HudDirty, Layer};
pub use error::{DisplayError, SurfaceError};
pub use input::{InputState, LogicalKey, PlatformEvent, Scancode};
pub use main_loop::{AudioService, Frame, MainLoop, Simulation};
pub use pacer::{TickMode, TimeDaemon};
pub use palette::{ColorTables, Palette, Rgb};
pub use pixel_format::{Depth, PixelFormat, TextureFormat};
pub use render::RenderContext;
pub use settings::{JoyMapping, Settings};
