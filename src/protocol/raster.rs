//! Raster job validation.
//!
//! The printer consumes pre-rendered 1-bit rows. This module does not render
//! anything; it only checks that a buffer can be streamed as whole chunks.

use crate::error::{Error, Result};
use crate::protocol::commands::CHUNK_SIZE;

/// Print head height of the LR30 in pixels.
pub const LABEL_HEIGHT_PX: usize = 64;

/// Narrowest label the printer accepts, in pixels.
pub const MIN_LABEL_WIDTH_PX: usize = 84;

/// Bytes in one column of the print head (64 px at 1 bit per pixel).
pub const BYTES_PER_COLUMN: usize = LABEL_HEIGHT_PX / 8;

/// One label image, validated to be a whole number of chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterJob<'a> {
    data: &'a [u8],
}

impl<'a> RasterJob<'a> {
    /// Validate a raster buffer.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() % CHUNK_SIZE != 0 {
            return Err(Error::MisalignedData { len: data.len() });
        }
        Ok(Self { data })
    }

    /// Raw bytes of the job.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Number of chunk commands the job needs.
    pub fn chunk_count(&self) -> usize {
        self.data.len() / CHUNK_SIZE
    }

    /// Label width in pixels, assuming full-height columns.
    pub fn width_px(&self) -> usize {
        self.data.len() / BYTES_PER_COLUMN
    }

    /// Iterate the job in 16-byte windows.
    pub fn chunks(&self) -> impl Iterator<Item = &'a [u8; CHUNK_SIZE]> + 'a {
        self.data.chunks_exact(CHUNK_SIZE).filter_map(|c| c.try_into().ok())
    }
}
