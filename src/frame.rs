use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Bytes per pixel of the only format exchanged between producer and sink
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel formats the adapter announces downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit packed R, G, B, A
    Rgba,
}

impl PixelFormat {
    /// Format string as used in raw video caps
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Rgba => "RGBA",
        }
    }
}

/// Geometry of one delivered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub width: u32,
    pub height: u32,
    /// Extra bytes the producer appends to every row
    pub padding: u32,
}

impl FrameMetadata {
    pub fn new(width: u32, height: u32, padding: u32) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    /// A frame without pixels can neither be packed nor announced downstream
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::InvalidGeometry {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Meaningful bytes in one row
    pub fn row_bytes(&self) -> Option<usize> {
        (self.width as usize).checked_mul(BYTES_PER_PIXEL)
    }

    /// Distance between the starts of two consecutive source rows
    pub fn stride(&self) -> Option<usize> {
        self.row_bytes()?.checked_add(self.padding as usize)
    }

    /// Minimum source size implied by the geometry
    pub fn required_size(&self) -> Option<usize> {
        self.stride()?.checked_mul(self.height as usize)
    }

    /// Size of the packed output
    pub fn packed_size(&self) -> Option<usize> {
        self.row_bytes()?.checked_mul(self.height as usize)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Borrowed view of producer memory, valid for a single export callback
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    pub meta: FrameMetadata,
}

impl<'a> RawFrame<'a> {
    pub fn new(data: &'a [u8], meta: FrameMetadata) -> Self {
        Self { data, meta }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Tightly packed frame owned by the adapter until it is pushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFrame {
    bytes: Bytes,
    width: u32,
    height: u32,
}

impl PackedFrame {
    pub(crate) fn new(bytes: Bytes, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Give up ownership of the pixel bytes, e.g. to wrap them in a sink buffer
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
