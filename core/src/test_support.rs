//! Test doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::ToString;
use std::vec::Vec;
use crate::backend::DisplayBackend;
use crate::blit::{self, Rect};
use crate::compositor::Layer;
use crate::error::{DisplayError, SurfaceError};
use crate::input::PlatformEvent;
use crate::pixel_format::{Depth, PixelFormat, TextureFormat};
use crate::surface::OffscreenBuffer;

/// Backend that remembers every call and fails on request.
pub struct RecordingBackend {
    pub format: TextureFormat,
    pub events: VecDeque<PlatformEvent>,
    pub blits: Vec<(Layer, Rect, (i32, i32))>,
    pub failing_layers: Vec<Layer>,
    pub fail_present: bool,
    /// Surface creations allowed before `create_surface` fails.
    pub surface_budget: Option<usize>,
    pub presents: usize,
    pub fullscreen: Option<bool>,
    pub joysticks_open: bool,
    pub shutdowns: usize,
}

impl RecordingBackend {
    pub fn new(depth: Depth) -> Self {
        Self {
            format: TextureFormat::of(depth),
            events: VecDeque::new(),
            blits: Vec::new(),
            failing_layers: Vec::new(),
            fail_present: false,
            surface_budget: None,
            presents: 0,
            fullscreen: None,
            joysticks_open: false,
            shutdowns: 0,
        }
    }

    pub fn take_blits(&mut self) -> Vec<Layer> {
        self.take_rects().into_iter().map(|(layer, _, _)| layer).collect()
    }

    pub fn take_rects(&mut self) -> Vec<(Layer, Rect, (i32, i32))> {
        std::mem::take(&mut self.blits)
    }
}

impl DisplayBackend for RecordingBackend {
    fn texture_format(&self) -> Result<TextureFormat, DisplayError> {
        Ok(self.format)
    }

    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<OffscreenBuffer, SurfaceError> {
        if let Some(budget) = self.surface_budget.as_mut() {
            if *budget == 0 {
                return Err(SurfaceError::Allocation { width, height });
            }
            *budget -= 1;
        }
        OffscreenBuffer::new(width, height, format)
    }

    fn blit(
        &mut self,
        layer: Layer,
        src: &OffscreenBuffer,
        src_rect: Rect,
        dst: &mut OffscreenBuffer,
        dst_x: i32,
        dst_y: i32,
    ) -> Result<(), DisplayError> {
        self.blits.push((layer, src_rect, (dst_x, dst_y)));
        if self.failing_layers.contains(&layer) {
            return Err(DisplayError::Blit("injected failure".to_string()));
        }
        blit::copy_rect(src, src_rect, dst, dst_x, dst_y)
    }

    fn present(&mut self, _frame: &OffscreenBuffer) -> Result<(), DisplayError> {
        if self.fail_present {
            return Err(DisplayError::Present("injected failure".to_string()));
        }
        self.presents += 1;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.events.pop_front()
    }

    fn open_joysticks(&mut self) -> Result<usize, DisplayError> {
        self.joysticks_open = true;
        Ok(1)
    }

    fn close_joysticks(&mut self) {
        self.joysticks_open = false;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = Some(fullscreen);
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }
}

/// Clock that only moves when told to, or when slept on. Clones share time.
#[derive(Clone, Default)]
pub struct ScriptedClock {
    now: Rc<Cell<f64>>,
    sleeps: Rc<RefCell<Vec<f64>>>,
}

impl ScriptedClock {
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }

    pub fn sleeps(&self) -> Vec<f64> {
        self.sleeps.borrow().clone()
    }
}

impl crate::pacer::TimeDaemon for ScriptedClock {
    fn get_now_ms(&self) -> f64 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: f64) {
        self.sleeps.borrow_mut().push(ms);
        self.advance(ms);
    }
}
