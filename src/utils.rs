//! Utility functions for the tepra-lite-ble crate.

use std::fmt::Write as _;

/// Format bytes as a lowercase hex string without separators.
///
/// # Example
///
/// ```
/// use tepra_lite_ble::utils::hex;
///
/// assert_eq!(hex(&[0xF0, 0x5A]), "f05a");
/// ```
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
