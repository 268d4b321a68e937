//! Packed ARGB8888 colors.
//!
//! A packed word stores alpha in the most significant byte followed by red,
//! green and blue: `(a << 24) | (r << 16) | (g << 8) | b`.

use serde::{Deserialize, Serialize};

/// Four independent 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const A_MASK: u32 = 0xFF00_0000;
    pub const R_MASK: u32 = 0x00FF_0000;
    pub const G_MASK: u32 = 0x0000_FF00;
    pub const B_MASK: u32 = 0x0000_00FF;

    /// Alpha used whenever a caller omits it
    pub const OPAQUE: u8 = 255;

    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const BLACK: Self = Self::new(0, 0, 0, Self::OPAQUE);
    pub const WHITE: Self = Self::new(255, 255, 255, Self::OPAQUE);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, Self::OPAQUE)
    }

    /// Build a color from wide integer channels, keeping only the low 8 bits
    /// of each. `256` becomes `0`, `-1` becomes `255`. Nothing is clamped.
    pub fn from_channels(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self::new(r as u8, g as u8, b as u8, a as u8)
    }

    pub const fn pack(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub const fn unpack(word: u32) -> Self {
        Self {
            a: ((word & Self::A_MASK) >> 24) as u8,
            r: ((word & Self::R_MASK) >> 16) as u8,
            g: ((word & Self::G_MASK) >> 8) as u8,
            b: (word & Self::B_MASK) as u8,
        }
    }

    pub const fn channels(self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }
}

/// Pack wide integer channels into one word, truncating each to 8 bits.
pub fn pack(r: i32, g: i32, b: i32, a: i32) -> u32 {
    Color::from_channels(r, g, b, a).pack()
}

/// Split a packed word into `(r, g, b, a)`.
pub fn unpack(word: u32) -> (u8, u8, u8, u8) {
    Color::unpack(word).channels()
}

impl From<Color> for u32 {
    fn from(color: Color) -> Self {
        color.pack()
    }
}

impl From<u32> for Color {
    fn from(word: u32) -> Self {
        Color::unpack(word)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color::rgb(r, g, b)
    }
}

impl From<(u8, u8, u8, u8)> for Color {
    fn from((r, g, b, a): (u8, u8, u8, u8)) -> Self {
        Color::new(r, g, b, a)
    }
}
