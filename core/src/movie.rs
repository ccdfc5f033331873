use alloc::vec;
use alloc::vec::Vec;
use log::{error, info};
use crate::backend::DisplayBackend;
use crate::blit::Rect;
use crate::compositor::{ComposeKind, ComposeReport, Layer};
use crate::error::SurfaceError;
use crate::palette::{ColorTables, Palette};
use crate::pixel_format::PixelFormat;
use crate::surface::{OffscreenBuffer, SurfaceHandle, SurfaceRegistry};
use crate::{HEIGHT, WIDTH};

/// Plays full-screen cutscenes: raw 8-bit frames with their own palette,
/// converted to the display depth and copied over the whole screen.
pub struct MoviePlayer {
    format: PixelFormat,
    handle: Option<SurfaceHandle>,
    frame: Vec<u8>,
    palette: Palette,
    tables: ColorTables,
}

impl MoviePlayer {
    pub fn new(format: PixelFormat, palette: &Palette) -> Self {
        Self {
            format,
            handle: None,
            frame: Vec::new(),
            palette: palette.clone(),
            tables: ColorTables::build(format.depth(), palette),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.handle.is_some()
    }

    /// Allocates the movie buffer. Starting an already running movie only
    /// swaps its palette.
    pub fn start<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        registry: &mut SurfaceRegistry,
        palette: &Palette,
    ) -> Result<(), SurfaceError> {
        self.set_palette(palette);
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = registry.create(backend, WIDTH, HEIGHT)?;
        if self.format.is_indexed() {
            if let Some(buffer) = registry.get_mut(handle) {
                buffer.set_palette(Some(palette));
            }
        }
        self.frame = vec![0; (WIDTH * HEIGHT) as usize];
        self.handle = Some(handle);
        info!("movie started");
        Ok(())
    }

    /// Frees the movie buffer. Returns false if no movie was playing.
    pub fn stop(&mut self, registry: &mut SurfaceRegistry) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        registry.destroy(handle);
        self.frame = Vec::new();
        info!("movie stopped");
        true
    }

    /// The raw 320x200 frame the decoder writes indices into.
    pub fn frame_mut(&mut self) -> Option<&mut [u8]> {
        if self.handle.is_none() {
            return None;
        }
        Some(&mut self.frame)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: &Palette) {
        self.palette = palette.clone();
        self.tables.rebuild(palette);
    }

    /// Converts the current frame into the movie buffer and copies it over
    /// the whole of `target`.
    pub fn compose<B: DisplayBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        registry: &mut SurfaceRegistry,
        target: &mut OffscreenBuffer,
    ) -> ComposeReport {
        let mut report = ComposeReport::new(ComposeKind::Movie);
        let Some(handle) = self.handle else {
            return report;
        };

        match registry.get_mut(handle) {
            Some(buffer) => {
                let bpp = self.format.bytes_per_pixel();
                let row_bytes = WIDTH as usize * bpp;
                for (y, src) in self.frame.chunks_exact(WIDTH as usize).enumerate() {
                    let dst = &mut buffer.row_mut(y as u32)[..row_bytes];
                    self.tables.convert_indexed(src, dst);
                }
            }
            None => error!("movie buffer vanished from the registry"),
        }

        if self.format.is_indexed() {
            target.set_palette(Some(&self.palette));
        }
        report.blit(
            backend,
            Layer::Movie,
            registry.get(handle),
            Rect::new(0, 0, WIDTH, HEIGHT),
            target,
            (0, 0),
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;
    use crate::pixel_format::Depth;
    use crate::surface::POOL_CAPACITY;
    use crate::test_support::RecordingBackend;

    fn setup(depth: Depth) -> (RecordingBackend, SurfaceRegistry, MoviePlayer, OffscreenBuffer) {
        let format = PixelFormat::new(depth);
        (
            RecordingBackend::new(depth),
            SurfaceRegistry::new(format),
            MoviePlayer::new(format, &Palette::default()),
            OffscreenBuffer::new(WIDTH, HEIGHT, format).unwrap(),
        )
    }

    fn red_palette() -> Palette {
        let mut palette = Palette::default();
        palette.set(5, Rgb::new(255, 0, 0));
        palette
    }

    #[test]
    fn test_frame_is_converted_at_every_depth() {
        for depth in Depth::ALL {
            let (mut backend, mut registry, mut movie, mut target) = setup(depth);
            let palette = red_palette();
            movie.start(&mut backend, &mut registry, &palette).unwrap();
            movie.frame_mut().unwrap()[WIDTH as usize * 3 + 7] = 5;

            let report = movie.compose(&mut backend, &mut registry, &mut target);
            assert_eq!(report.kind, ComposeKind::Movie);
            assert_eq!(report.failures, 0);

            let tables = ColorTables::build(depth, &palette);
            assert_eq!(target.get_pixel(7, 3), Some(tables.encode(5)), "{:?}", depth);
            assert_eq!(tables.decode(target.get_pixel(7, 3).unwrap()), Rgb::new(255, 0, 0));
        }
    }

    #[test]
    fn test_indexed_movie_brings_its_palette() {
        let (mut backend, mut registry, mut movie, mut target) = setup(Depth::Indexed8);
        movie.start(&mut backend, &mut registry, &red_palette()).unwrap();
        movie.compose(&mut backend, &mut registry, &mut target);
        assert_eq!(target.palette().map(|p| p.get(5)), Some(Rgb::new(255, 0, 0)));
    }

    #[test]
    fn test_stop_releases_the_buffer() {
        let (mut backend, mut registry, mut movie, _) = setup(Depth::Rgb16);
        movie.start(&mut backend, &mut registry, &Palette::default()).unwrap();
        movie.start(&mut backend, &mut registry, &Palette::default()).unwrap();
        assert_eq!(registry.live_count(), 1);

        assert!(movie.stop(&mut registry));
        assert!(!movie.stop(&mut registry));
        assert!(!movie.is_playing());
        assert!(movie.frame_mut().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_full_pool_refuses_the_movie() {
        let (mut backend, mut registry, mut movie, _) = setup(Depth::Rgb32);
        for _ in 0..POOL_CAPACITY {
            registry.create(&mut backend, 1, 1).unwrap();
        }
        assert_eq!(
            movie.start(&mut backend, &mut registry, &Palette::default()),
            Err(SurfaceError::PoolExhausted { capacity: POOL_CAPACITY })
        );
        assert!(!movie.is_playing());
    }
}
