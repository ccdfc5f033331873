use alloc::format;
use crate::error::DisplayError;
use crate::surface::OffscreenBuffer;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Overlapping area of both rectangles, `None` if they do not touch.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }
}

/// Software blitter. Copies `src_rect` of `src` to (`dst_x`, `dst_y`) of
/// `dst`, clipped against both buffers. Both buffers must share a pixel format.
pub fn copy_rect(
    src: &OffscreenBuffer,
    src_rect: Rect,
    dst: &mut OffscreenBuffer,
    dst_x: i32,
    dst_y: i32,
) -> Result<(), DisplayError> {
    if src.format() != dst.format() {
        return Err(DisplayError::Blit(format!(
            "pixel format mismatch: {:?} -> {:?}",
            src.format().depth(),
            dst.format().depth()
        )));
    }

    let Some(clipped) = src_rect.intersect(&src.bounds()) else {
        return Ok(());
    };
    let dx = dst_x + (clipped.x - src_rect.x);
    let dy = dst_y + (clipped.y - src_rect.y);
    let Some(visible) = Rect::new(dx, dy, clipped.w, clipped.h).intersect(&dst.bounds()) else {
        return Ok(());
    };
    let sx = (clipped.x + (visible.x - dx)) as usize;
    let sy = (clipped.y + (visible.y - dy)) as usize;

    let bpp = src.format().bytes_per_pixel();
    let row_bytes = visible.w as usize * bpp;
    let (src_pitch, dst_pitch) = (src.pitch(), dst.pitch());
    let src_pixels = src.pixels();
    let dst_pixels = dst.pixels_mut();

    for row in 0..visible.h as usize {
        let s = (sy + row) * src_pitch + sx * bpp;
        let d = (visible.y as usize + row) * dst_pitch + visible.x as usize * bpp;
        dst_pixels[d..d + row_bytes].copy_from_slice(&src_pixels[s..s + row_bytes]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::{Depth, PixelFormat};

    fn buffer(w: u32, h: u32, depth: Depth) -> OffscreenBuffer {
        OffscreenBuffer::new(w, h, PixelFormat::new(depth)).unwrap()
    }

    #[test]
    fn test_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersect(&Rect::new(5, 5, 10, 10)), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 4, 4)), None);
        assert_eq!(a.intersect(&Rect::new(-3, 2, 5, 0)), None);
    }

    #[test]
    fn test_copies_rect_at_offset() {
        let mut src = buffer(8, 8, Depth::Rgb16);
        src.fill_rect(Rect::new(2, 2, 3, 3), 0x1234);
        let mut dst = buffer(16, 16, Depth::Rgb16);

        copy_rect(&src, Rect::new(2, 2, 3, 3), &mut dst, 10, 1).unwrap();

        assert_eq!(dst.get_pixel(10, 1), Some(0x1234));
        assert_eq!(dst.get_pixel(12, 3), Some(0x1234));
        assert_eq!(dst.get_pixel(13, 3), Some(0));
        assert_eq!(dst.get_pixel(9, 1), Some(0));
    }

    #[test]
    fn test_clips_against_destination() {
        let mut src = buffer(4, 4, Depth::Rgb32);
        src.fill(0xabcdef);
        let mut dst = buffer(4, 4, Depth::Rgb32);

        copy_rect(&src, src.bounds(), &mut dst, -2, 3).unwrap();

        assert_eq!(dst.get_pixel(0, 3), Some(0xabcdef));
        assert_eq!(dst.get_pixel(1, 3), Some(0xabcdef));
        assert_eq!(dst.get_pixel(2, 3), Some(0));
        assert_eq!(dst.get_pixel(0, 2), Some(0));
    }

    #[test]
    fn test_clips_against_source() {
        let mut src = buffer(4, 4, Depth::Indexed8);
        src.fill(7);
        let mut dst = buffer(8, 8, Depth::Indexed8);

        // only the 2x2 corner of the request lies inside the source
        copy_rect(&src, Rect::new(2, 2, 6, 6), &mut dst, 0, 0).unwrap();

        assert_eq!(dst.get_pixel(1, 1), Some(7));
        assert_eq!(dst.get_pixel(2, 2), Some(0));
    }

    #[test]
    fn test_fully_clipped_blit_is_not_an_error() {
        let src = buffer(4, 4, Depth::Rgb24);
        let mut dst = buffer(4, 4, Depth::Rgb24);
        assert!(copy_rect(&src, src.bounds(), &mut dst, 100, 100).is_ok());
    }

    #[test]
    fn test_format_mismatch_fails() {
        let src = buffer(4, 4, Depth::Rgb24);
        let mut dst = buffer(4, 4, Depth::Rgb32);
        assert!(matches!(
            copy_rect(&src, src.bounds(), &mut dst, 0, 0),
            Err(DisplayError::Blit(_))
        ));
    }
}
