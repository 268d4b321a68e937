//! Buffer construction.
//!
//! Buffers come either from an image file, through a [`Decoder`], or from
//! explicit dimensions, zero-filled (fully transparent black).

use log::{debug, warn};
use std::path::{Path, PathBuf};
use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::{ImageDataError, Result};
use crate::settings::Settings;

/// Raw decoder output: ARGB8888 words, row-major, no row padding
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

/// Turns an encoded image file into packed pixels.
pub trait Decoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// Decoder for every format the `image` crate understands
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let img = image::open(path).map_err(|e| ImageDataError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                Color::new(r, g, b, a).pack()
            })
            .collect();

        Ok(DecodedImage { pixels, width, height })
    }
}

pub struct BufferFactory<D: Decoder = ImageDecoder> {
    decoder: D,
    settings: Settings,
}

impl BufferFactory<ImageDecoder> {
    pub fn new(settings: Settings) -> Self {
        Self::with_decoder(ImageDecoder, settings)
    }
}

impl Default for BufferFactory<ImageDecoder> {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<D: Decoder> BufferFactory<D> {
    pub fn with_decoder(decoder: D, settings: Settings) -> Self {
        Self { decoder, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decode `path` (resolved against `asset_root`) into a new buffer.
    pub fn from_file(&self, path: &Path) -> Result<PixelBuffer> {
        let full_path = self.settings.resolve(path);

        let decoded = self.decoder.decode(&full_path).map_err(|e| {
            warn!("decode of {} failed: {}", full_path.display(), e);
            e
        })?;
        let DecodedImage { pixels, width, height } = decoded;

        if width == 0 || height == 0 {
            return Err(decode_error(&full_path, format!("image has empty extent {}x{}", width, height)));
        }
        self.check_pixel_budget(width as i64, height as i64)?;

        let buffer = PixelBuffer::from_words(width, height, pixels)
            .map_err(|e| decode_error(&full_path, e.to_string()))?;

        debug!("decoded {} into {}x{} buffer", full_path.display(), width, height);
        Ok(buffer)
    }

    /// Allocate a zeroed `width x height` buffer.
    pub fn from_dimensions(&self, width: i64, height: i64) -> Result<PixelBuffer> {
        if width <= 0 || height <= 0 {
            return Err(ImageDataError::InvalidDimension { width, height });
        }
        let count = self.check_pixel_budget(width, height)?;
        let allocation_failure = || ImageDataError::AllocationFailure { width, height };
        let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(allocation_failure()),
        };

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(count).map_err(|_| allocation_failure())?;
        pixels.resize(count, 0);

        debug!("allocated blank {}x{} buffer", width, height);
        PixelBuffer::from_words(w, h, pixels)
    }

    /// Pixel count for the given extent, or `AllocationFailure` when it
    /// overflows or exceeds `max_pixels`.
    fn check_pixel_budget(&self, width: i64, height: i64) -> Result<usize> {
        width
            .checked_mul(height)
            .filter(|&count| count as u64 <= self.settings.max_pixels)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or(ImageDataError::AllocationFailure { width, height })
    }
}

fn decode_error(path: &Path, reason: String) -> ImageDataError {
    ImageDataError::Decode {
        path: PathBuf::from(path),
        reason,
    }
}
