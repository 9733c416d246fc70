// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # tepra-lite-ble
//!
//! A Rust driver for the Bluetooth Low Energy print protocol of TEPRA Lite
//! LR30 label printers.
//!
//! The crate covers everything between an already rendered 1-bit raster and
//! a printed label:
//!
//! - **Discovery**: find the printer by its advertised name (`LR30`, `TepraBLE`)
//! - **Handshake**: ready probe and print depth negotiation
//! - **Transfer**: 16-byte chunks in the printer's wire order, with the
//!   mandatory buffer drain wait every six chunks
//! - **Completion**: status polling until the printer stops reporting busy
//!
//! Rendering images into the raster format is left to the caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tepra_lite_ble::{Result, TepraPrinter};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // 84 px wide label, 64 px tall print head, 1 bit per pixel
//!     let raster = vec![0u8; 84 * 8];
//!
//!     let printer = TepraPrinter::new();
//!     let report = printer.print(0, &raster).await?;
//!     println!("Printed {} chunks", report.chunks_sent);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom transports
//!
//! [`PrintEngine`] only needs a [`Link`] to write frames and a
//! [`NotificationSlot`] fed with the printer's notifications, so it can run
//! over any transport that can carry them.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for configuration and
//!   report types

// Public modules
pub mod ble;
pub mod engine;
pub mod error;
pub mod link;
pub mod notification;
pub mod printer;
pub mod protocol;
pub mod utils;

// Re-exports for convenience
pub use engine::{EngineConfig, JobStage, PrintEngine, PrintOutcome, PrintReport};
pub use error::{Error, Result};
pub use link::Link;
pub use notification::{notification_slot, NotificationSender, NotificationSlot};
pub use printer::{PrinterConfig, TepraPrinter};

// Re-export commonly used types from submodules
pub use ble::{Advertisement, BleLink, ConnectionState, DeviceLocator};
pub use protocol::{encode_depth, permute_chunk, Opcode, PrintStatus, RasterJob};
