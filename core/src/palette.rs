use alloc::boxed::Box;
use crate::pixel_format::Depth;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// The 256 colors every indexed image of the game refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self::rgb332()
    }
}

impl Palette {
    pub const fn from_colors(colors: [Rgb; 256]) -> Self {
        Self { colors }
    }

    /// Builds a palette from packed `r, g, b` triples.
    pub fn from_rgb24(bytes: &[u8; 768]) -> Self {
        let mut colors = [Rgb::BLACK; 256];
        for (color, rgb) in colors.iter_mut().zip(bytes.chunks_exact(3)) {
            *color = Rgb::new(rgb[0], rgb[1], rgb[2]);
        }
        Self { colors }
    }

    /// 3 bits red, 3 bits green, 2 bits blue; every index a distinct color.
    pub fn rgb332() -> Self {
        let mut colors = [Rgb::BLACK; 256];
        for (i, color) in colors.iter_mut().enumerate() {
            let r = (i >> 5) & 0b111;
            let g = (i >> 2) & 0b111;
            let b = i & 0b11;
            *color = Rgb::new((r * 255 / 7) as u8, (g * 255 / 7) as u8, (b * 255 / 3) as u8);
        }
        Self { colors }
    }

    #[inline(always)]
    pub fn get(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    pub fn set(&mut self, index: u8, color: Rgb) {
        self.colors[index as usize] = color;
    }

    pub fn colors(&self) -> &[Rgb; 256] {
        &self.colors
    }

    /// Index of the entry closest to `color`. Ties go to the lowest index.
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let distance = entry.distance_sq(color);
            if distance < best_distance {
                best = i;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

#[inline(always)]
fn expand5(v: u32) -> u8 {
    ((v << 3) | (v >> 2)) as u8
}

#[inline(always)]
fn expand6(v: u32) -> u8 {
    ((v << 2) | (v >> 4)) as u8
}

const fn pack555(c: Rgb) -> u16 {
    (((c.r as u16) >> 3) << 10) | (((c.g as u16) >> 3) << 5) | ((c.b as u16) >> 3)
}

const fn pack565(c: Rgb) -> u16 {
    (((c.r as u16) >> 3) << 11) | (((c.g as u16) >> 2) << 5) | ((c.b as u16) >> 3)
}

const fn pack888(c: Rgb) -> u32 {
    (c.r as u32) | ((c.g as u32) << 8) | ((c.b as u32) << 16)
}

/// Lookup tables turning an 8-bit color index into a pixel of the
/// negotiated depth. Always rebuilt whole from a palette.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorTables {
    Indexed(Box<Palette>),
    Packed { depth: Depth, table: Box<[u16; 256]> },
    Expanded { depth: Depth, table: Box<[u32; 256]> },
}

impl ColorTables {
    pub fn build(depth: Depth, palette: &Palette) -> Self {
        match depth {
            Depth::Indexed8 => ColorTables::Indexed(Box::new(palette.clone())),
            Depth::Rgb15 | Depth::Rgb16 => {
                let pack = if depth == Depth::Rgb15 { pack555 } else { pack565 };
                let mut table = Box::new([0u16; 256]);
                for (entry, color) in table.iter_mut().zip(palette.colors()) {
                    *entry = pack(*color);
                }
                ColorTables::Packed { depth, table }
            }
            Depth::Rgb24 | Depth::Rgb32 => {
                let mut table = Box::new([0u32; 256]);
                for (entry, color) in table.iter_mut().zip(palette.colors()) {
                    *entry = pack888(*color);
                }
                ColorTables::Expanded { depth, table }
            }
        }
    }

    /// Replaces every entry from `palette`; never patches a subset.
    pub fn rebuild(&mut self, palette: &Palette) {
        *self = Self::build(self.depth(), palette);
    }

    pub fn depth(&self) -> Depth {
        match self {
            ColorTables::Indexed(_) => Depth::Indexed8,
            ColorTables::Packed { depth, .. } | ColorTables::Expanded { depth, .. } => *depth,
        }
    }

    /// Size of the lookup data in bytes.
    pub fn table_bytes(&self) -> usize {
        match self {
            ColorTables::Indexed(_) => 256 * 3,
            ColorTables::Packed { table, .. } => table.len() * 2,
            ColorTables::Expanded { table, .. } => table.len() * 4,
        }
    }

    #[inline(always)]
    pub fn encode(&self, index: u8) -> u32 {
        match self {
            ColorTables::Indexed(_) => index as u32,
            ColorTables::Packed { table, .. } => table[index as usize] as u32,
            ColorTables::Expanded { table, .. } => table[index as usize],
        }
    }

    /// Pixel value of the palette entry closest to `color`.
    pub fn encode_rgb(&self, color: Rgb) -> u32 {
        match self {
            ColorTables::Indexed(palette) => palette.nearest(color) as u32,
            ColorTables::Packed { depth: Depth::Rgb15, .. } => pack555(color) as u32,
            ColorTables::Packed { .. } => pack565(color) as u32,
            ColorTables::Expanded { .. } => pack888(color),
        }
    }

    /// Turns a pixel value of this depth back into a color. Indexed values go
    /// through the palette held by the tables.
    #[inline(always)]
    pub fn decode(&self, value: u32) -> Rgb {
        decode_with(self.depth(), value, self.palette())
    }

    pub fn palette(&self) -> Option<&Palette> {
        match self {
            ColorTables::Indexed(palette) => Some(palette),
            _ => None,
        }
    }

    /// Converts a run of 8-bit indices into pixels of this depth.
    /// `dst` must hold `src.len()` pixels.
    pub fn convert_indexed(&self, src: &[u8], dst: &mut [u8]) {
        match self {
            ColorTables::Indexed(_) => {
                dst[..src.len()].copy_from_slice(src);
            }
            ColorTables::Packed { table, .. } => {
                for (index, px) in src.iter().zip(dst.chunks_exact_mut(2)) {
                    px.copy_from_slice(&table[*index as usize].to_le_bytes());
                }
            }
            ColorTables::Expanded { depth, table } => {
                let bpp = depth.bytes_per_pixel();
                for (index, px) in src.iter().zip(dst.chunks_exact_mut(bpp)) {
                    px.copy_from_slice(&table[*index as usize].to_le_bytes()[..bpp]);
                }
            }
        }
    }
}

/// Decodes a pixel of `depth`; indexed pixels need a palette and decode to
/// black without one.
pub fn decode_with(depth: Depth, value: u32, palette: Option<&Palette>) -> Rgb {
    match depth {
        Depth::Indexed8 => palette.map_or(Rgb::BLACK, |p| p.get(value as u8)),
        Depth::Rgb15 => Rgb::new(
            expand5((value >> 10) & 0x1f),
            expand5((value >> 5) & 0x1f),
            expand5(value & 0x1f),
        ),
        Depth::Rgb16 => Rgb::new(
            expand5((value >> 11) & 0x1f),
            expand6((value >> 5) & 0x3f),
            expand5(value & 0x1f),
        ),
        Depth::Rgb24 | Depth::Rgb32 => Rgb::new(
            (value & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            ((value >> 16) & 0xff) as u8,
        ),
    }
}
