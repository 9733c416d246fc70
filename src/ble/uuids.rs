//! BLE Service and Characteristic UUIDs.
//!
//! Contains the GATT identifiers and advertised names used to reach a
//! TEPRA Lite printer.

use uuid::Uuid;

/// Print service UUID.
pub const PRINT_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fff0_0000_1000_8000_00805f9b34fb);
/// Notify characteristic UUID (replies from the printer).
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_fff1_0000_1000_8000_00805f9b34fb);
/// Write characteristic UUID (commands to the printer).
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_fff2_0000_1000_8000_00805f9b34fb);

/// Name prefixes the supported printer advertises under.
pub const TARGET_NAME_PREFIXES: [&str; 2] = ["LR30", "TepraBLE"];

/// Check if a UUID belongs to the print service.
pub fn is_print_characteristic(uuid: &Uuid) -> bool {
    *uuid == NOTIFY_CHARACTERISTIC_UUID || *uuid == WRITE_CHARACTERISTIC_UUID
}
