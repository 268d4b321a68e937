//! Script-facing surface.
//!
//! Scripts pass loosely typed [`Value`]s. This layer checks argument counts
//! and types, picks the constructor by arity, and converts results back to
//! values. The pixel core underneath only ever sees typed arguments.
//!
//! Exposed to scripts:
//! - `newImageData(path)` / `newImageData(width, height)`
//! - `ImageData:getWidth()`, `getHeight()`, `getDimensions()`, `type()`
//! - `ImageData:getPixel(x, y)` -> `r, g, b, a`
//! - `ImageData:setPixel(x, y, r, g, b [, a = 255])`
//! - `ImageData:mapPixel(fn(x, y, r, g, b, a) -> r, g, b [, a])`

use log::{debug, warn};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use crate::buffer::PixelBuffer;
use crate::color::Color;
use crate::error::{ImageDataError, Result};
use crate::factory::{BufferFactory, Decoder, ImageDecoder};
use crate::mapper::{map_all, PixelVisit};
use crate::registry::{BufferId, BufferOrigin, BufferRegistry, RegistryEntry};
use crate::settings::Settings;

/// Name scripts see for buffer handles
pub const TYPE_NAME: &str = "ImageData";

/// A callable supplied by script code
pub type ScriptFunction = Rc<dyn Fn(&[Value]) -> Result<Vec<Value>>>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Function(ScriptFunction),
}

impl Value {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>> + 'static,
    {
        Value::Function(Rc::new(f))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
        }
    }

    /// Numbers truncated toward zero; `None` for anything non-numeric.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            Value::Number(n) => Some(n.trunc() as i64),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Function(_) => write!(f, "function"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<u8> for Value {
    fn from(i: u8) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

// ============================================================================
// ARGUMENT CHECKING
// ============================================================================

fn bad_argument(position: usize, op: &str, expected: &str, got: Option<&Value>) -> ImageDataError {
    let got = got.map_or("no value", Value::type_name);
    ImageDataError::InvalidArgument(format!(
        "bad argument #{} to '{}' ({} expected, got {})",
        position, op, expected, got
    ))
}

fn check_integer(args: &[Value], index: usize, op: &str) -> Result<i64> {
    let value = args.get(index);
    value
        .and_then(Value::as_integer)
        .ok_or_else(|| bad_argument(index + 1, op, "number", value))
}

/// Coordinates and dimensions pass through unchanged, so range errors report
/// the value the script actually supplied.
fn check_coordinate(args: &[Value], index: usize, op: &str) -> Result<i64> {
    check_integer(args, index, op)
}

/// Channels keep their low bits; the color codec truncates them to 8.
fn check_channel(args: &[Value], index: usize, op: &str) -> Result<i32> {
    Ok(check_integer(args, index, op)? as i32)
}

fn optional_channel(args: &[Value], index: usize, op: &str) -> Result<i32> {
    match args.get(index) {
        None | Some(Value::Nil) => Ok(Color::OPAQUE as i32),
        Some(_) => check_channel(args, index, op),
    }
}

// ============================================================================
// HOST
// ============================================================================

/// Owns the buffer factory and the registry of live handles.
pub struct Host<D: Decoder = ImageDecoder> {
    factory: BufferFactory<D>,
    registry: Rc<RefCell<BufferRegistry>>,
}

impl Host<ImageDecoder> {
    pub fn new(settings: Settings) -> Self {
        Self::with_decoder(ImageDecoder, settings)
    }
}

impl<D: Decoder> Host<D> {
    pub fn with_decoder(decoder: D, settings: Settings) -> Self {
        Self {
            factory: BufferFactory::with_decoder(decoder, settings),
            registry: Rc::new(RefCell::new(BufferRegistry::new())),
        }
    }

    pub fn settings(&self) -> &Settings {
        self.factory.settings()
    }

    /// `newImageData`: one argument decodes a file, two allocate a blank buffer.
    pub fn create(&self, args: &[Value]) -> Result<ImageData> {
        const OP: &str = "newImageData";
        match args.len() {
            1 => match &args[0] {
                Value::String(path) => self.create_from_path(Path::new(path)),
                other => Err(bad_argument(1, OP, "string", Some(other))),
            },
            2 => {
                let width = check_coordinate(args, 0, OP)?;
                let height = check_coordinate(args, 1, OP)?;
                self.create_blank(width, height)
            }
            n => Err(ImageDataError::InvalidArgument(format!(
                "{} requires 1 or 2 arguments, {} given.",
                OP, n
            ))),
        }
    }

    pub fn create_from_path(&self, path: &Path) -> Result<ImageData> {
        let buffer = self.factory.from_file(path)?;
        Ok(self.adopt(buffer, BufferOrigin::File(path.to_path_buf())))
    }

    pub fn create_blank(&self, width: i64, height: i64) -> Result<ImageData> {
        let buffer = self.factory.from_dimensions(width, height)?;
        Ok(self.adopt(buffer, BufferOrigin::Blank))
    }

    fn adopt(&self, buffer: PixelBuffer, origin: BufferOrigin) -> ImageData {
        let registration = if self.settings().track_buffers {
            let (width, height) = buffer.dimensions();
            let id = self.registry.borrow_mut().register(width, height, origin);
            Some(Registration { id, registry: Rc::clone(&self.registry) })
        } else {
            None
        };
        ImageData { buffer: Some(buffer), registration }
    }

    pub fn live_buffers(&self) -> usize {
        self.registry.borrow().live_count()
    }

    pub fn registry_snapshot(&self) -> Vec<RegistryEntry> {
        self.registry.borrow().snapshot()
    }
}

// ============================================================================
// IMAGE DATA HANDLE
// ============================================================================

struct Registration {
    id: BufferId,
    registry: Rc<RefCell<BufferRegistry>>,
}

/// Script handle owning one pixel buffer.
///
/// Dropping the handle, or calling [`release`](Self::release), frees the
/// pixels and unregisters the buffer. Releasing more than once does nothing.
pub struct ImageData {
    buffer: Option<PixelBuffer>,
    registration: Option<Registration>,
}

impl ImageData {
    pub fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    pub fn id(&self) -> Option<BufferId> {
        self.registration.as_ref().map(|r| r.id)
    }

    pub fn is_released(&self) -> bool {
        self.buffer.is_none()
    }

    pub fn buffer(&self) -> Result<&PixelBuffer> {
        self.buffer.as_ref().ok_or_else(released_error)
    }

    pub fn buffer_mut(&mut self) -> Result<&mut PixelBuffer> {
        self.buffer.as_mut().ok_or_else(released_error)
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.buffer()?.width())
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.buffer()?.height())
    }

    pub fn dimensions(&self) -> Result<(u32, u32)> {
        Ok(self.buffer()?.dimensions())
    }

    /// `getPixel(x, y)` -> `r, g, b, a`
    pub fn get(&self, args: &[Value]) -> Result<Vec<Value>> {
        const OP: &str = "getPixel";
        let x = check_coordinate(args, 0, OP)?;
        let y = check_coordinate(args, 1, OP)?;
        let (r, g, b, a) = self.buffer()?.get(x, y)?.channels();
        Ok(vec![r.into(), g.into(), b.into(), a.into()])
    }

    /// `setPixel(x, y, r, g, b [, a])`
    pub fn set(&mut self, args: &[Value]) -> Result<()> {
        const OP: &str = "setPixel";
        let x = check_coordinate(args, 0, OP)?;
        let y = check_coordinate(args, 1, OP)?;
        let r = check_channel(args, 2, OP)?;
        let g = check_channel(args, 3, OP)?;
        let b = check_channel(args, 4, OP)?;
        let a = optional_channel(args, 5, OP)?;
        self.buffer_mut()?.set(x, y, Color::from_channels(r, g, b, a))
    }

    /// `mapPixel(transform)`
    pub fn map(&mut self, args: &[Value]) -> Result<()> {
        const OP: &str = "mapPixel";
        if args.len() != 1 {
            return Err(ImageDataError::InvalidArgument(format!(
                "{} requires 1 argument, {} given.",
                OP,
                args.len()
            )));
        }
        let transform = match &args[0] {
            Value::Function(f) => Rc::clone(f),
            other => {
                return Err(ImageDataError::InvalidArgument(format!(
                    "{} requires a function as argument, got {}",
                    OP,
                    other.type_name()
                )))
            }
        };

        let buffer = self.buffer_mut()?;
        debug!("{} over {}x{} buffer", OP, buffer.width(), buffer.height());
        map_all(buffer, |visit| call_transform(&transform, visit))
    }

    /// Method dispatch by script name.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Vec<Value>> {
        match method {
            "getWidth" => Ok(vec![self.width()?.into()]),
            "getHeight" => Ok(vec![self.height()?.into()]),
            "getDimensions" => {
                let (width, height) = self.dimensions()?;
                Ok(vec![width.into(), height.into()])
            }
            "getPixel" => self.get(args),
            "setPixel" => self.set(args).map(|()| Vec::new()),
            "mapPixel" => self.map(args).map(|()| Vec::new()),
            "type" => Ok(vec![TYPE_NAME.into()]),
            other => Err(ImageDataError::InvalidArgument(format!(
                "{} has no method '{}'",
                TYPE_NAME, other
            ))),
        }
    }

    /// Free the pixels and unregister. Safe to call any number of times.
    pub fn release(&mut self) {
        if self.buffer.take().is_some() {
            debug!("released {} {:?}", TYPE_NAME, self.id());
        }
        if let Some(registration) = self.registration.take() {
            registration.registry.borrow_mut().release(registration.id);
        }
    }
}

impl Drop for ImageData {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(TYPE_NAME)
            .field("id", &self.id())
            .field("dimensions", &self.buffer.as_ref().map(PixelBuffer::dimensions))
            .finish()
    }
}

fn released_error() -> ImageDataError {
    warn!("{} used after release", TYPE_NAME);
    ImageDataError::InvalidArgument(format!("{} has been released", TYPE_NAME))
}

/// Invoke a script transform for one pixel and read back 3 or 4 channels.
/// Values past the fourth are dropped, as a fixed-result script call would.
fn call_transform(transform: &ScriptFunction, visit: PixelVisit) -> Result<Color> {
    const OP: &str = "mapPixel";
    let PixelVisit { x, y, color } = visit;
    let (r, g, b, a) = color.channels();
    let args: [Value; 6] = [x.into(), y.into(), r.into(), g.into(), b.into(), a.into()];

    let returned = transform(&args)?;
    if returned.len() < 3 {
        return Err(ImageDataError::InvalidArgument(format!(
            "{} transform must return at least 3 values, returned {}",
            OP,
            returned.len()
        )));
    }

    let channel = |index: usize| {
        returned[index]
            .as_integer()
            .map(|v| v as i32)
            .ok_or_else(|| bad_return(index, &returned[index]))
    };
    let r = channel(0)?;
    let g = channel(1)?;
    let b = channel(2)?;
    let a = match returned.get(3) {
        None | Some(Value::Nil) => Color::OPAQUE as i32,
        Some(_) => channel(3)?,
    };
    Ok(Color::from_channels(r, g, b, a))
}

fn bad_return(index: usize, value: &Value) -> ImageDataError {
    ImageDataError::InvalidArgument(format!(
        "mapPixel transform return value #{} must be a number, got {}",
        index + 1,
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn host() -> Host {
        Host::new(Settings::default())
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    #[test]
    fn test_arity_dispatch() {
        let host = host();
        let img = host.create(&ints(&[4, 3])).unwrap();
        assert_eq!(img.dimensions().unwrap(), (4, 3));

        let err = host.create(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: newImageData requires 1 or 2 arguments, 0 given.");
        assert!(matches!(host.create(&ints(&[1, 2, 3])), Err(ImageDataError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_wrong_types() {
        let host = host();
        assert!(matches!(host.create(&ints(&[4])), Err(ImageDataError::InvalidArgument(_))));
        assert!(matches!(
            host.create(&["a".into(), 2.into()]),
            Err(ImageDataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_create_rejects_bad_dimensions() {
        let host = host();
        assert!(matches!(host.create(&ints(&[0, 5])), Err(ImageDataError::InvalidDimension { .. })));
        assert!(matches!(host.create(&ints(&[-1, 5])), Err(ImageDataError::InvalidDimension { .. })));
        assert_eq!(host.live_buffers(), 0);
    }

    #[test]
    fn test_float_arguments_truncate() {
        let host = host();
        let mut img = host.create(&[Value::Number(2.9), Value::Number(2.2)]).unwrap();
        assert_eq!(img.dimensions().unwrap(), (2, 2));
        img.set(&[1.7.into(), 0.2.into(), 10.into(), 20.into(), 30.into()]).unwrap();
        assert_eq!(img.get(&ints(&[1, 0])).unwrap(), ints(&[10, 20, 30, 255]));
    }

    #[test]
    fn test_set_get_scenario() {
        let host = host();
        let mut img = host.create(&ints(&[2, 2])).unwrap();
        img.set(&ints(&[1, 1, 10, 20, 30, 40])).unwrap();
        assert_eq!(img.get(&ints(&[1, 1])).unwrap(), ints(&[10, 20, 30, 40]));
        assert_eq!(img.get(&ints(&[0, 0])).unwrap(), ints(&[0, 0, 0, 0]));
    }

    #[test]
    fn test_set_truncates_channels() {
        let host = host();
        let mut img = host.create(&ints(&[1, 1])).unwrap();
        img.set(&ints(&[0, 0, 256, -1, 513, 300])).unwrap();
        assert_eq!(img.get(&ints(&[0, 0])).unwrap(), ints(&[0, 255, 1, 44]));
    }

    #[test]
    fn test_set_nil_alpha_is_opaque() {
        let host = host();
        let mut img = host.create(&ints(&[1, 1])).unwrap();
        img.set(&[0.into(), 0.into(), 1.into(), 2.into(), 3.into(), Value::Nil]).unwrap();
        assert_eq!(img.get(&ints(&[0, 0])).unwrap(), ints(&[1, 2, 3, 255]));
    }

    #[test]
    fn test_out_of_bounds_through_host() {
        let host = host();
        let mut img = host.create(&ints(&[2, 2])).unwrap();
        assert!(matches!(img.get(&ints(&[2, 0])), Err(ImageDataError::OutOfBounds { .. })));
        assert!(matches!(
            img.set(&ints(&[0, -1, 1, 1, 1])),
            Err(ImageDataError::OutOfBounds { .. })
        ));
        assert!(matches!(
            img.get(&[Value::Integer(i64::MAX), 0.into()]),
            Err(ImageDataError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_errors_report_script_values() {
        let host = host();
        let huge = 1_i64 << 31;
        let err = host.create(&ints(&[huge, huge])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not allocate a 2147483648x2147483648 pixel buffer"
        );

        let err = host.create(&ints(&[-(1 << 40), 5])).unwrap_err();
        assert!(matches!(err, ImageDataError::InvalidDimension { width, height: 5 } if width == -(1 << 40)));

        let img = host.create(&ints(&[2, 2])).unwrap();
        let err = img.get(&ints(&[1 << 32, 0])).unwrap_err();
        assert!(matches!(err, ImageDataError::OutOfBounds { x: 4_294_967_296, y: 0, .. }));
    }

    #[test]
    fn test_missing_argument_message() {
        let host = host();
        let img = host.create(&ints(&[2, 2])).unwrap();
        let err = img.get(&ints(&[0])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: bad argument #2 to 'getPixel' (number expected, got no value)"
        );
    }

    #[test]
    fn test_map_order_and_default_alpha() {
        let host = host();
        let mut img = host.create(&ints(&[2, 2])).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        let transform = Value::function(move |args| {
            let x = args[0].as_integer().unwrap();
            let y = args[1].as_integer().unwrap();
            seen.borrow_mut().push((x, y));
            Ok(ints(&[x * 10, y * 10, 5]))
        });
        img.map(&[transform]).unwrap();

        assert_eq!(*log.borrow(), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(img.get(&ints(&[1, 0])).unwrap(), ints(&[10, 0, 5, 255]));
    }

    #[test]
    fn test_map_identity() {
        let host = host();
        let mut img = host.create(&ints(&[3, 2])).unwrap();
        img.set(&ints(&[2, 1, 9, 8, 7, 6])).unwrap();
        let before = img.buffer().unwrap().clone();
        img.map(&[Value::function(|args| Ok(args[2..6].to_vec()))]).unwrap();
        assert_eq!(img.buffer().unwrap(), &before);
    }

    #[test]
    fn test_map_requires_function() {
        let host = host();
        let mut img = host.create(&ints(&[1, 1])).unwrap();
        assert!(matches!(img.map(&ints(&[5])), Err(ImageDataError::InvalidArgument(_))));
        assert!(matches!(img.map(&[]), Err(ImageDataError::InvalidArgument(_))));
    }

    #[test]
    fn test_map_bad_return_count() {
        let host = host();
        let mut img = host.create(&ints(&[1, 1])).unwrap();
        let result = img.map(&[Value::function(|_| Ok(ints(&[1, 2])))]);
        assert!(matches!(result, Err(ImageDataError::InvalidArgument(_))));
    }

    #[test]
    fn test_map_ignores_values_past_alpha() {
        let host = host();
        let mut img = host.create(&ints(&[1, 1])).unwrap();
        img.map(&[Value::function(|_| Ok(ints(&[9, 8, 7, 6, 5, 4])))]).unwrap();
        assert_eq!(img.get(&ints(&[0, 0])).unwrap(), ints(&[9, 8, 7, 6]));
    }

    #[test]
    fn test_map_error_aborts_traversal() {
        let host = host();
        let mut img = host.create(&ints(&[2, 2])).unwrap();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let transform = Value::function(move |_| {
            counter.set(counter.get() + 1);
            if counter.get() == 2 {
                Err(ImageDataError::Transform("script error".to_string()))
            } else {
                Ok(ints(&[1, 1, 1, 1]))
            }
        });
        let err = img.map(&[transform]).unwrap_err();
        assert!(matches!(err, ImageDataError::Transform(_)));
        assert_eq!(calls.get(), 2);
        assert_eq!(img.get(&ints(&[0, 0])).unwrap(), ints(&[1, 1, 1, 1]));
        assert_eq!(img.get(&ints(&[0, 1])).unwrap(), ints(&[0, 0, 0, 0]));
    }

    #[test]
    fn test_call_dispatch() {
        let host = host();
        let mut img = host.create(&ints(&[5, 7])).unwrap();
        assert_eq!(img.call("getWidth", &[]).unwrap(), ints(&[5]));
        assert_eq!(img.call("getHeight", &[]).unwrap(), ints(&[7]));
        assert_eq!(img.call("getDimensions", &[]).unwrap(), ints(&[5, 7]));
        assert_eq!(img.call("type", &[]).unwrap(), vec![Value::from("ImageData")]);
        assert!(img.call("setPixel", &ints(&[0, 0, 1, 2, 3])).unwrap().is_empty());
        assert_eq!(img.call("getPixel", &ints(&[0, 0])).unwrap(), ints(&[1, 2, 3, 255]));
        assert!(matches!(img.call("resize", &[]), Err(ImageDataError::InvalidArgument(_))));
    }

    #[test]
    fn test_release_is_idempotent() {
        let host = host();
        let mut img = host.create(&ints(&[2, 2])).unwrap();
        let other = host.create(&ints(&[1, 1])).unwrap();
        assert_eq!(host.live_buffers(), 2);

        img.release();
        img.release();
        assert!(img.is_released());
        assert_eq!(host.live_buffers(), 1);
        assert!(matches!(img.get(&ints(&[0, 0])), Err(ImageDataError::InvalidArgument(_))));

        drop(img);
        drop(other);
        assert_eq!(host.live_buffers(), 0);
    }

    #[test]
    fn test_untracked_buffers() {
        let host = Host::new(Settings { track_buffers: false, ..Default::default() });
        let img = host.create(&ints(&[2, 2])).unwrap();
        assert_eq!(img.id(), None);
        assert_eq!(host.live_buffers(), 0);
    }
}
