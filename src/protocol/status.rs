//! Status reply parsing.
//!
//! A status poll is answered with a notification of at least four bytes.
//! Only byte 2 carries meaning: `0x01` while the printer is busy. Every
//! other value ends the job; the raw byte is kept so callers can log it.

use crate::error::{Error, Result};
use crate::utils::hex;

/// Status byte reported while the label is still printing.
pub const STATUS_BUSY: u8 = 0x01;

/// Print status decoded from a status poll reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrintStatus {
    /// The printer is still printing.
    Busy,
    /// The printer is no longer busy. Holds the raw status byte.
    Finished(u8),
}

impl PrintStatus {
    /// Minimum size of a status reply.
    pub const MIN_SIZE: usize = 4;

    /// Offset of the status byte.
    const STATUS_OFFSET: usize = 2;

    /// Parse a status poll reply.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::MalformedReply { reply: hex(data) });
        }

        Ok(match data[Self::STATUS_OFFSET] {
            STATUS_BUSY => Self::Busy,
            other => Self::Finished(other),
        })
    }

    /// Check whether the printer is still busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }
}
