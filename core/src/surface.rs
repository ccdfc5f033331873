use alloc::boxed::Box;
use alloc::vec::Vec;
use heapless::Vec as BoundedVec;
use log::{debug, info};
use crate::backend::DisplayBackend;
use crate::blit::Rect;
use crate::error::SurfaceError;
use crate::palette::Palette;
use crate::pixel_format::PixelFormat;

/// Most off-screen buffers alive at once.
pub const POOL_CAPACITY: usize = 100;

/// Raw pixel storage of one off-screen surface.
#[derive(Clone, Debug)]
pub struct OffscreenBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    pitch: usize,
    pixels: Vec<u8>,
    palette: Option<Box<Palette>>,
    slot: Option<u16>,
}

impl OffscreenBuffer {
    /// Allocates a zeroed (black) buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidSize { width, height });
        }
        let pitch = width as usize * format.bytes_per_pixel();
        let len = pitch * height as usize;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| SurfaceError::Allocation { width, height })?;
        pixels.resize(len, 0);

        Ok(Self {
            width,
            height,
            format,
            pitch,
            pixels,
            palette: None,
            slot: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Registry slot the buffer lives in, `None` outside the pool.
    pub fn slot(&self) -> Option<u16> {
        self.slot
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_deref()
    }

    pub fn set_palette(&mut self, palette: Option<&Palette>) {
        self.palette = palette.map(|p| Box::new(p.clone()));
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.pixels[start..start + self.pitch]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        &mut self.pixels[start..start + self.pitch]
    }

    pub fn fill(&mut self, value: u32) {
        let bpp = self.format.bytes_per_pixel();
        let bytes = value.to_le_bytes();
        for px in self.pixels.chunks_exact_mut(bpp) {
            px.copy_from_slice(&bytes[..bpp]);
        }
    }

    /// Fills `rect` clipped to the buffer.
    pub fn fill_rect(&mut self, rect: Rect, value: u32) {
        let Some(area) = rect.intersect(&self.bounds()) else {
            return;
        };
        let bpp = self.format.bytes_per_pixel();
        let bytes = value.to_le_bytes();
        for y in area.y..area.bottom() {
            let row = self.row_mut(y as u32);
            let start = area.x as usize * bpp;
            let end = area.right() as usize * bpp;
            for px in row[start..end].chunks_exact_mut(bpp) {
                px.copy_from_slice(&bytes[..bpp]);
            }
        }
    }

    #[inline(always)]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        Some(y as usize * self.pitch + x as usize * self.format.bytes_per_pixel())
    }

    /// Out-of-bounds writes are dropped.
    pub fn put_pixel(&mut self, x: i32, y: i32, value: u32) {
        if let Some(at) = self.offset(x, y) {
            let bpp = self.format.bytes_per_pixel();
            self.format.store(&mut self.pixels[at..at + bpp], value);
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        let at = self.offset(x, y)?;
        let bpp = self.format.bytes_per_pixel();
        Some(self.format.load(&self.pixels[at..at + bpp]))
    }
}

/// Index into the pool plus the generation it was handed out at. A handle
/// outliving its buffer never resolves to whatever reuses the slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    index: u16,
    generation: u32,
}

impl SurfaceHandle {
    pub fn index(&self) -> u16 {
        self.index
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    buffer: Option<OffscreenBuffer>,
}

/// Bounded arena owning every off-screen buffer.
pub struct SurfaceRegistry {
    format: PixelFormat,
    palette: Option<Box<Palette>>,
    slots: BoundedVec<Slot, POOL_CAPACITY>,
    free: BoundedVec<u16, POOL_CAPACITY>,
    live: usize,
}

impl SurfaceRegistry {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            palette: None,
            slots: BoundedVec::new(),
            free: BoundedVec::new(),
            live: 0,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub const fn capacity(&self) -> usize {
        POOL_CAPACITY
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Asks the backend for a buffer of the pool's format. 8-bit buffers get
    /// the current palette attached.
    pub fn create<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if self.free.is_empty() && self.slots.is_full() {
            return Err(SurfaceError::PoolExhausted { capacity: POOL_CAPACITY });
        }

        let mut buffer = backend.create_surface(width, height, self.format)?;
        if self.format.is_indexed() {
            buffer.set_palette(self.palette.as_deref());
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u16;
                self.slots
                    .push(Slot { generation: 0, buffer: None })
                    .map_err(|_| SurfaceError::PoolExhausted { capacity: POOL_CAPACITY })?;
                index
            }
        };
        buffer.slot = Some(index);

        let slot = &mut self.slots[index as usize];
        slot.buffer = Some(buffer);
        self.live += 1;
        debug!("surface #{} created: {}x{} ({} live)", index, width, height, self.live);

        Ok(SurfaceHandle { index, generation: slot.generation })
    }

    /// Frees the buffer behind `handle`. Returns false if it was already gone.
    pub fn destroy(&mut self, handle: SurfaceHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.buffer.is_none() {
            return false;
        }
        slot.buffer = None;
        slot.generation = slot.generation.wrapping_add(1);
        // cannot overflow: at most one free entry per slot
        let _ = self.free.push(handle.index);
        self.live -= 1;
        debug!("surface #{} freed ({} live)", handle.index, self.live);
        true
    }

    /// Releases every live buffer and returns how many there were.
    pub fn destroy_all(&mut self) -> usize {
        let mut released = 0;
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.buffer.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                let _ = self.free.push(index as u16);
                released += 1;
            }
        }
        self.live = 0;
        if released > 0 {
            info!("{} surfaces released", released);
        }
        released
    }

    pub fn get(&self, handle: SurfaceHandle) -> Option<&OffscreenBuffer> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.buffer.as_ref())
    }

    pub fn get_mut(&mut self, handle: SurfaceHandle) -> Option<&mut OffscreenBuffer> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.buffer.as_mut())
    }

    /// New palette for every 8-bit buffer, live or created later.
    pub fn set_palette(&mut self, palette: &Palette) {
        if !self.format.is_indexed() {
            return;
        }
        self.palette = Some(Box::new(palette.clone()));
        for buffer in self.slots.iter_mut().filter_map(|slot| slot.buffer.as_mut()) {
            buffer.set_palette(Some(palette));
        }
    }
}
