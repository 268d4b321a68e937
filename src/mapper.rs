//! Whole-buffer per-pixel transforms.
//!
//! [`map_all`] visits every pixel exactly once, hands its coordinates and
//! color to a caller-supplied transform, and writes the returned color back
//! to the same coordinate before moving on.
//!
//! The visiting order is column by column: x in the outer loop, y in the
//! inner loop. A 2x2 buffer is visited as (0,0), (0,1), (1,0), (1,1).
//! Transforms with side effects can observe this order and existing scripts
//! depend on it, so it must not be changed to row-major.
//!
//! Each call runs to completion before the next one starts. There is no
//! batching and no parallelism. If the transform fails, the pass stops at
//! that pixel and returns the error. Pixels written before the failure keep
//! their new values.

use log::debug;
use crate::buffer::PixelBuffer;
use crate::color::Color;

/// Coordinates and current color of the pixel being visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelVisit {
    pub x: i64,
    pub y: i64,
    pub color: Color,
}

/// Run `transform` over every pixel of `buffer`, x outer and y inner.
///
/// The transform may return anything convertible to [`Color`]; a 3-tuple
/// gets alpha 255.
pub fn map_all<F, C, E>(buffer: &mut PixelBuffer, mut transform: F) -> Result<(), E>
where
    F: FnMut(PixelVisit) -> Result<C, E>,
    C: Into<Color>,
{
    let (width, height) = buffer.dimensions();
    debug!("mapping {}x{} buffer", width, height);

    for x in 0..width {
        for y in 0..height {
            let index = y as usize * width as usize + x as usize;
            let visit = PixelVisit {
                x: x as i64,
                y: y as i64,
                color: Color::unpack(buffer.word_at(index)),
            };
            let color: Color = transform(visit)?.into();
            buffer.put_word(index, color.pack());
        }
    }
    Ok(())
}

/// [`map_all`] for transforms that cannot fail.
pub fn map_all_infallible<F, C>(buffer: &mut PixelBuffer, mut transform: F)
where
    F: FnMut(PixelVisit) -> C,
    C: Into<Color>,
{
    let result: Result<(), std::convert::Infallible> = map_all(buffer, |visit| Ok(transform(visit)));
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl PixelBuffer {
    /// See [`map_all`].
    pub fn map_pixels<F, C, E>(&mut self, transform: F) -> Result<(), E>
    where
        F: FnMut(PixelVisit) -> Result<C, E>,
        C: Into<Color>,
    {
        map_all(self, transform)
    }
}
