//! Command frame construction.
//!
//! Every command is an opcode pair `0xF0, <sub-opcode>` followed by up to
//! 16 parameter bytes. Frames are written to the printer without a
//! write-acknowledgement; replies, when expected, arrive as notifications.

use crate::error::{Error, Result};

/// First byte of every command frame.
pub const COMMAND_PREFIX: u8 = 0xF0;

/// Size of one raster chunk in bytes.
pub const CHUNK_SIZE: usize = 16;

/// Source index order used when emitting a chunk.
///
/// The 16 bytes are four 4-byte groups; groups are emitted in reverse order
/// within each 8-byte half, and the two byte pairs of each group swapped.
pub const CHUNK_PERMUTATION: [usize; CHUNK_SIZE] =
    [6, 7, 4, 5, 2, 3, 0, 1, 14, 15, 12, 13, 10, 11, 8, 9];

/// Smallest accepted print depth.
pub const MIN_DEPTH: i32 = -3;

/// Largest accepted print depth.
pub const MAX_DEPTH: i32 = 3;

/// Sub-opcodes understood by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Ask whether the printer is ready to accept a job.
    ReadyProbe = 0x5A,
    /// Set the print depth.
    SetDepth = 0x5B,
    /// One 16-byte raster chunk.
    Chunk = 0x5C,
    /// No more raster data follows.
    EndOfStream = 0x5D,
    /// Query the print status.
    StatusPoll = 0x5E,
}

impl Opcode {
    /// Create from raw byte value.
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0x5A => Some(Self::ReadyProbe),
            0x5B => Some(Self::SetDepth),
            0x5C => Some(Self::Chunk),
            0x5D => Some(Self::EndOfStream),
            0x5E => Some(Self::StatusPoll),
            _ => None,
        }
    }

    /// Convert to raw byte value.
    pub fn to_raw(&self) -> u8 {
        *self as u8
    }

    /// Identify the opcode of an encoded frame.
    pub fn of_frame(frame: &[u8]) -> Option<Self> {
        match frame {
            [COMMAND_PREFIX, op, ..] => Self::from_raw(*op),
            _ => None,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadyProbe => write!(f, "ready probe"),
            Self::SetDepth => write!(f, "set depth"),
            Self::Chunk => write!(f, "chunk"),
            Self::EndOfStream => write!(f, "end of stream"),
            Self::StatusPoll => write!(f, "status poll"),
        }
    }
}

/// Map a print depth onto its protocol byte.
///
/// Depths 0..=3 are sent as-is; -1..=-3 become 0x11..=0x13.
pub fn encode_depth(depth: i32) -> Result<u8> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
        return Err(Error::InvalidDepth { depth });
    }

    let byte = if depth < 0 { 0x10 - depth } else { depth };
    Ok(byte as u8)
}

/// Reorder one raster chunk into wire order.
pub fn permute_chunk(chunk: &[u8; CHUNK_SIZE]) -> [u8; CHUNK_SIZE] {
    let mut out = [0u8; CHUNK_SIZE];
    for (dst, &src) in out.iter_mut().zip(CHUNK_PERMUTATION.iter()) {
        *dst = chunk[src];
    }
    out
}

/// `[F0 5A]`
pub fn ready_probe() -> Vec<u8> {
    vec![COMMAND_PREFIX, Opcode::ReadyProbe.to_raw()]
}

/// `[F0 5B d 06]`, where `d` is an already-encoded depth byte.
pub fn set_depth(depth_byte: u8) -> Vec<u8> {
    vec![COMMAND_PREFIX, Opcode::SetDepth.to_raw(), depth_byte, 0x06]
}

/// `[F0 5C <16 permuted bytes>]`
pub fn chunk(bytes: &[u8; CHUNK_SIZE]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + CHUNK_SIZE);
    frame.push(COMMAND_PREFIX);
    frame.push(Opcode::Chunk.to_raw());
    frame.extend_from_slice(&permute_chunk(bytes));
    frame
}

/// `[F0 5D 00]`
pub fn end_of_stream() -> Vec<u8> {
    vec![COMMAND_PREFIX, Opcode::EndOfStream.to_raw(), 0x00]
}

/// `[F0 5E]`
pub fn status_poll() -> Vec<u8> {
    vec![COMMAND_PREFIX, Opcode::StatusPoll.to_raw()]
}
