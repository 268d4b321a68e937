//! Pixel buffers ("image data") backing sprites and generated images.
//!
//! - [`color`]: ARGB8888 packing
//! - [`buffer`]: bounds-checked row-major pixel storage
//! - [`factory`]: buffers from image files or blank dimensions
//! - [`mapper`]: per-pixel transforms over a whole buffer
//! - [`registry`]: live-buffer diagnostics
//! - [`host`]: loosely typed entry points for script bindings

pub mod buffer;
pub mod color;
pub mod error;
pub mod factory;
pub mod host;
pub mod mapper;
pub mod registry;
pub mod settings;

pub use buffer::PixelBuffer;
pub use color::Color;
pub use error::{ImageDataError, Result};
pub use factory::{BufferFactory, DecodedImage, Decoder, ImageDecoder};
pub use host::{Host, ImageData, Value};
pub use mapper::{map_all, map_all_infallible, PixelVisit};
pub use registry::{BufferId, BufferOrigin, BufferRegistry, RegistryEntry};
pub use settings::Settings;
