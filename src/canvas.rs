use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One opaque canvas colour, 8 bits per channel.
///
/// The wire format everywhere (API payloads, logs, zone reports) is a
/// lowercase `"rrggbb"` hex string; `Display`, `FromStr` and the serde
/// impls all use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Error)]
#[error("invalid colour {0:?}, expected \"rrggbb\"")]
pub struct ParseColourError(String);

impl FromStr for Rgb {
    type Err = ParseColourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseColourError(s.to_string()));
        }
        let channel = |range| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseColourError(s.to_string()))
        };
        Ok(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseColourError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(colour: Rgb) -> String {
        colour.to_string()
    }
}

/// Canvas dimensions, fetched once at startup and assumed stable for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn byte_len(self) -> usize {
        self.area() as usize * 3
    }
}

#[derive(Debug, Error)]
#[error("canvas snapshot is {got} bytes, expected {expected} for {width}x{height}")]
pub struct SnapshotLengthError {
    pub got: usize,
    pub expected: usize,
    pub width: u32,
    pub height: u32,
}

/// One full read of the canvas: a row-major RGB buffer, 3 bytes per pixel,
/// origin top-left. The canvas itself has no transparency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSnapshot {
    size: CanvasSize,
    data: Vec<u8>,
}

impl CanvasSnapshot {
    /// Decode a raw byte buffer as returned by the full-canvas read.
    pub fn from_bytes(size: CanvasSize, data: Vec<u8>) -> Result<Self, SnapshotLengthError> {
        if data.len() != size.byte_len() {
            return Err(SnapshotLengthError {
                got: data.len(),
                expected: size.byte_len(),
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self { size, data })
    }

    /// A synthetic snapshot filled with one colour, used when the backend
    /// reports the full-canvas endpoint as temporarily gone.
    pub fn blank(size: CanvasSize, fill: Rgb) -> Self {
        let mut data = Vec::with_capacity(size.byte_len());
        for _ in 0..size.area() {
            data.extend_from_slice(&[fill.r, fill.g, fill.b]);
        }
        Self { size, data }
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.size.width && y < self.size.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let i = self.index(x, y)?;
        Some(Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }

    /// Overwrite one cached pixel, e.g. after a single-pixel refresh read.
    /// Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, colour: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = colour.r;
            self.data[i + 1] = colour.g;
            self.data[i + 2] = colour.b;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_raw(self.size.width, self.size.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.size.width, self.size.height))
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        Some((y as usize * self.size.width as usize + x as usize) * 3)
    }
}
