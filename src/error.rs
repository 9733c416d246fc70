//! Error types for the tepra-lite-ble crate.

use std::time::Duration;
use thiserror::Error;

use crate::engine::JobStage;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No printer advertising a known name was seen within the scan window.
    #[error("No printer found within {window:?}")]
    DeviceNotFound {
        /// How long the scan ran before giving up.
        window: Duration,
    },

    /// Failed to establish a connection to the printer.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// Operation requires a connection but the printer is not connected.
    #[error("Printer not connected")]
    NotConnected,

    /// Print depth outside the supported range.
    #[error("invalid depth: {depth} (must be within -3..=3)")]
    InvalidDepth {
        /// The rejected depth.
        depth: i32,
    },

    /// Raster length is not a whole number of 16-byte chunks.
    #[error("insufficient length, image data length must be aligned to 16 (got {len} bytes)")]
    MisalignedData {
        /// Length of the rejected raster.
        len: usize,
    },

    /// A request that expects a notification got none in time.
    #[error("{}: no reply within {timeout:?}", .stage.failure_reason())]
    NoReply {
        /// Stage of the job that was waiting.
        stage: JobStage,
        /// The wait that elapsed.
        timeout: Duration,
    },

    /// A status reply was too short to interpret.
    #[error("received an invalid reply: {reply}")]
    MalformedReply {
        /// Hex dump of the reply.
        reply: String,
    },

    /// The printer did not drain its buffer during the transfer.
    #[error("printer buffer stalled after chunk {chunk} of {total}")]
    BufferStall {
        /// One-based index of the chunk after which the wait timed out.
        chunk: usize,
        /// Total chunks in the job.
        total: usize,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },
}

impl Error {
    /// Whether the error was raised by input validation before any write.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::InvalidDepth { .. } | Self::MisalignedData { .. })
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
