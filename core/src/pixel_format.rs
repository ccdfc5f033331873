use log::info;
use crate::backend::DisplayBackend;
use crate::error::DisplayError;
use crate::palette::{ColorTables, Palette};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Depth {
    Indexed8,
    Rgb15,
    Rgb16,
    Rgb24,
    Rgb32,
}

impl Depth {
    pub const ALL: [Depth; 5] = [Depth::Indexed8, Depth::Rgb15, Depth::Rgb16, Depth::Rgb24, Depth::Rgb32];

    pub const fn bits(self) -> u8 {
        match self {
            Depth::Indexed8 => 8,
            Depth::Rgb15 => 15,
            Depth::Rgb16 => 16,
            Depth::Rgb24 => 24,
            Depth::Rgb32 => 32,
        }
    }

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Depth::Indexed8 => 1,
            Depth::Rgb15 | Depth::Rgb16 => 2,
            Depth::Rgb24 => 3,
            Depth::Rgb32 => 4,
        }
    }

    /// Maps a backend texture format onto one of the depths we draw in.
    ///
    /// A 24-bit format padded to 4 bytes is treated as 32-bit.
    pub const fn from_texture_format(format: TextureFormat) -> Option<Depth> {
        match (format.bits_per_pixel, format.bytes_per_pixel) {
            (8, 1) => Some(Depth::Indexed8),
            (15, 2) => Some(Depth::Rgb15),
            (16, 2) => Some(Depth::Rgb16),
            (24, 3) => Some(Depth::Rgb24),
            (24, 4) | (32, 4) => Some(Depth::Rgb32),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelMasks {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl ChannelMasks {
    pub const RGB555: ChannelMasks = ChannelMasks { r: 0x7c00, g: 0x03e0, b: 0x001f };
    pub const RGB565: ChannelMasks = ChannelMasks { r: 0xf800, g: 0x07e0, b: 0x001f };
    // little-endian byte order r, g, b (, pad)
    pub const RGB888: ChannelMasks = ChannelMasks { r: 0x0000_00ff, g: 0x0000_ff00, b: 0x00ff_0000 };
}

/// Best texture format a backend can upload, as it reports it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureFormat {
    pub bits_per_pixel: u8,
    pub bytes_per_pixel: u8,
}

impl TextureFormat {
    pub const fn new(bits_per_pixel: u8, bytes_per_pixel: u8) -> Self {
        Self { bits_per_pixel, bytes_per_pixel }
    }

    pub const fn of(depth: Depth) -> Self {
        Self::new(depth.bits(), depth.bytes_per_pixel() as u8)
    }
}

/// Pixel layout shared by every buffer once the display is up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    depth: Depth,
}

impl PixelFormat {
    pub const fn new(depth: Depth) -> Self {
        Self { depth }
    }

    pub const fn depth(&self) -> Depth {
        self.depth
    }

    pub const fn bits_per_pixel(&self) -> u8 {
        self.depth.bits()
    }

    pub const fn bytes_per_pixel(&self) -> usize {
        self.depth.bytes_per_pixel()
    }

    pub const fn is_indexed(&self) -> bool {
        matches!(self.depth, Depth::Indexed8)
    }

    /// `None` in 8-bit mode, where colors go through the palette instead.
    pub const fn masks(&self) -> Option<ChannelMasks> {
        match self.depth {
            Depth::Indexed8 => None,
            Depth::Rgb15 => Some(ChannelMasks::RGB555),
            Depth::Rgb16 => Some(ChannelMasks::RGB565),
            Depth::Rgb24 | Depth::Rgb32 => Some(ChannelMasks::RGB888),
        }
    }

    /// Writes one pixel value into `dst`, which must be exactly one pixel wide.
    #[inline(always)]
    pub fn store(&self, dst: &mut [u8], value: u32) {
        let bytes = value.to_le_bytes();
        dst.copy_from_slice(&bytes[..self.bytes_per_pixel()]);
    }

    #[inline(always)]
    pub fn load(&self, src: &[u8]) -> u32 {
        let mut bytes = [0u8; 4];
        bytes[..self.bytes_per_pixel()].copy_from_slice(src);
        u32::from_le_bytes(bytes)
    }
}

/// Queries the backend for its texture format and builds the color tables
/// for it. Runs once at startup; the depth is fixed afterwards.
pub fn negotiate<B: DisplayBackend + ?Sized>(
    backend: &B,
    palette: &Palette,
) -> Result<(PixelFormat, ColorTables), DisplayError> {
    let texture = backend.texture_format()?;
    let unsupported = DisplayError::UnsupportedDepth {
        bits: texture.bits_per_pixel,
        bytes: texture.bytes_per_pixel,
    };

    if texture.bits_per_pixel < 8 {
        return Err(unsupported);
    }
    let depth = Depth::from_texture_format(texture).ok_or(unsupported)?;

    info!(
        "depth of screen: {}; bytes per pixel: {}",
        depth.bits(),
        depth.bytes_per_pixel()
    );

    let format = PixelFormat::new(depth);
    let tables = ColorTables::build(depth, palette);
    Ok((format, tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessBackend;

    #[test]
    fn test_negotiates_each_supported_depth() {
        for depth in Depth::ALL {
            let backend = HeadlessBackend::new(TextureFormat::of(depth));
            let (format, tables) = negotiate(&backend, &Palette::default()).unwrap();
            assert_eq!(format.depth(), depth);
            assert_eq!(tables.depth(), depth);
        }
    }

    #[test]
    fn test_padded_24_bit_is_drawn_as_32_bit() {
        let backend = HeadlessBackend::new(TextureFormat::new(24, 4));
        let (format, _) = negotiate(&backend, &Palette::default()).unwrap();
        assert_eq!(format.depth(), Depth::Rgb32);
        assert_eq!(format.bytes_per_pixel(), 4);
    }

    #[test]
    fn test_rejects_depth_below_eight_bits() {
        let backend = HeadlessBackend::new(TextureFormat::new(4, 1));
        assert_eq!(
            negotiate(&backend, &Palette::default()).unwrap_err(),
            DisplayError::UnsupportedDepth { bits: 4, bytes: 1 }
        );
    }

    #[test]
    fn test_rejects_unknown_layouts() {
        let backend = HeadlessBackend::new(TextureFormat::new(12, 2));
        assert!(matches!(
            negotiate(&backend, &Palette::default()),
            Err(DisplayError::UnsupportedDepth { bits: 12, bytes: 2 })
        ));
    }

    #[test]
    fn test_store_and_load_respect_pixel_width() {
        let format = PixelFormat::new(Depth::Rgb24);
        let mut px = [0xAAu8; 3];
        format.store(&mut px, 0x00_11_22_33);
        assert_eq!(px, [0x33, 0x22, 0x11]);
        assert_eq!(format.load(&px), 0x11_22_33);
    }
}
