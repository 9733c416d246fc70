//! BLE communication module.
//!
//! This module provides the Bluetooth Low Energy side of the crate:
//! discovering the printer, connecting to it and carrying command frames
//! and notifications for the print engine.

pub mod connection;
pub mod link;
pub mod locator;
pub mod scanner;
pub mod uuids;

pub use connection::{ConnectionManager, ConnectionState};
pub use link::BleLink;
pub use locator::{Advertisement, DeviceLocator};
pub use scanner::BleScanner;
pub use uuids::*;
