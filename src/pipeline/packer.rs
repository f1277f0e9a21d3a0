//! Stride removal: padded producer rows into a tightly packed frame

use std::collections::TryReserveError;

use bytes::Bytes;

use crate::error::FrameError;
use crate::frame::{PackedFrame, RawFrame};

/// Grows the destination buffer by the given number of bytes, or reports why it cannot
pub(crate) type Reserve = fn(&mut Vec<u8>, usize) -> Result<(), TryReserveError>;

pub(crate) fn reserve_exact(buf: &mut Vec<u8>, additional: usize) -> Result<(), TryReserveError> {
    buf.try_reserve_exact(additional)
}

/// Pack a padded source frame into a new buffer of exactly `width * height * 4` bytes.
///
/// Fails without producing output when the source is shorter than the geometry
/// implies or the destination cannot be allocated.
pub fn pack_rows(frame: RawFrame<'_>) -> Result<PackedFrame, FrameError> {
    pack_rows_into(frame, reserve_exact)
}

/// [`pack_rows`] with the destination allocation delegated to `reserve`
pub(crate) fn pack_rows_into(
    frame: RawFrame<'_>,
    reserve: Reserve,
) -> Result<PackedFrame, FrameError> {
    let meta = frame.meta;
    meta.validate()?;

    let short = || FrameError::InsufficientBufferSize {
        width: meta.width,
        height: meta.height,
        padding: meta.padding,
        size: frame.size(),
    };
    let required = meta.required_size().ok_or_else(short)?;
    if frame.size() < required {
        return Err(short());
    }

    // `required` fits, so none of its factors can overflow
    let (row_bytes, stride, packed_size) =
        match (meta.row_bytes(), meta.stride(), meta.packed_size()) {
            (Some(row_bytes), Some(stride), Some(packed_size)) => (row_bytes, stride, packed_size),
            _ => return Err(short()),
        };

    let mut packed = Vec::new();
    reserve(&mut packed, packed_size).map_err(|_| FrameError::AllocationFailure {
        bytes: packed_size,
    })?;

    if meta.padding == 0 {
        packed.extend_from_slice(&frame.data[..packed_size]);
    } else {
        for row in frame.data.chunks(stride).take(meta.height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
    }

    debug_assert_eq!(packed.len(), packed_size);
    Ok(PackedFrame::new(
        Bytes::from(packed),
        meta.width,
        meta.height,
    ))
}
