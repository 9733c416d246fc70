//! Protocol module for encoding commands and parsing replies.
//!
//! This module contains the implementations for:
//! - Command frame encoding, including the chunk byte permutation
//! - Status reply parsing
//! - Raster job validation

pub mod commands;
pub mod raster;
pub mod status;

pub use commands::{encode_depth, permute_chunk, Opcode, CHUNK_SIZE};
pub use raster::RasterJob;
pub use status::PrintStatus;
