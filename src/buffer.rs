use crate::color::Color;
use crate::error::{ImageDataError, Result};

/// Bytes per packed pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Row-major buffer of packed ARGB words.
///
/// Width and height are fixed at creation and `pixels.len() == width * height`
/// always holds. Rows are tightly packed, so `pitch == width * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pitch: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Wrap already-packed words. Fails if either dimension is zero or the word
    /// count does not match `width * height`.
    pub fn from_words(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageDataError::InvalidDimension {
                width: width as i64,
                height: height as i64,
            });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ImageDataError::InvalidArgument(format!(
                "{}x{} buffer needs {} pixels, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pitch: width as usize * BYTES_PER_PIXEL,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bytes spanned by one row
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Raw packed words, row-major
    pub fn words(&self) -> &[u32] {
        &self.pixels
    }

    pub fn into_words(self) -> Vec<u32> {
        self.pixels
    }

    pub fn get(&self, x: i64, y: i64) -> Result<Color> {
        let index = self.index_of(x, y)?;
        Ok(Color::unpack(self.pixels[index]))
    }

    pub fn set(&mut self, x: i64, y: i64, color: Color) -> Result<()> {
        let index = self.index_of(x, y)?;
        self.pixels[index] = color.pack();
        Ok(())
    }

    /// Same as [`set`](Self::set) with alpha 255.
    pub fn set_rgb(&mut self, x: i64, y: i64, r: u8, g: u8, b: u8) -> Result<()> {
        self.set(x, y, Color::rgb(r, g, b))
    }

    /// Word offset of `(x, y)`, or `OutOfBounds`.
    pub fn index_of(&self, x: i64, y: i64) -> Result<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return Err(ImageDataError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y as usize * (self.pitch / BYTES_PER_PIXEL) + x as usize)
    }

    /// Unchecked read used by the mapper, which only visits valid offsets.
    pub(crate) fn word_at(&self, index: usize) -> u32 {
        self.pixels[index]
    }

    pub(crate) fn put_word(&mut self, index: usize, word: u32) {
        self.pixels[index] = word;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_words(width, height, vec![0; (width * height) as usize]).unwrap()
    }

    #[test]
    fn test_pitch_is_four_bytes_per_pixel() {
        let buf = blank(7, 3);
        assert_eq!(buf.pitch(), 28);
        assert_eq!(buf.dimensions(), (7, 3));
        assert_eq!(buf.words().len(), 21);
    }

    #[test]
    fn test_set_then_get() {
        let mut buf = blank(2, 2);
        buf.set(1, 1, Color::new(10, 20, 30, 40)).unwrap();
        assert_eq!(buf.get(1, 1).unwrap(), Color::new(10, 20, 30, 40));
        assert_eq!(buf.get(0, 0).unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn test_row_major_offsets() {
        let mut buf = blank(3, 2);
        buf.set(2, 1, Color::WHITE).unwrap();
        assert_eq!(buf.index_of(2, 1).unwrap(), 5);
        assert_eq!(buf.words()[5], 0xFFFF_FFFF);
    }

    #[test]
    fn test_set_rgb_defaults_alpha() {
        let mut a = blank(1, 1);
        let mut b = blank(1, 1);
        a.set_rgb(0, 0, 1, 2, 3).unwrap();
        b.set(0, 0, Color::new(1, 2, 3, 255)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounds() {
        let mut buf = blank(4, 3);
        for (x, y) in [(4, 0), (0, 3), (-1, 0), (0, -1), (i64::MAX, i64::MIN), (1 << 32, 0)] {
            assert!(matches!(buf.get(x, y), Err(ImageDataError::OutOfBounds { .. })));
            assert!(matches!(
                buf.set(x, y, Color::WHITE),
                Err(ImageDataError::OutOfBounds { .. })
            ));
        }
        assert!(buf.words().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_from_words_rejects_bad_length() {
        assert!(matches!(
            PixelBuffer::from_words(2, 2, vec![0; 3]),
            Err(ImageDataError::InvalidArgument(_))
        ));
        assert!(matches!(
            PixelBuffer::from_words(0, 2, vec![]),
            Err(ImageDataError::InvalidDimension { .. })
        ));
    }
}
