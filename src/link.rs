//! Transport seam between the print engine and the BLE stack.

use async_trait::async_trait;

use crate::error::Result;

/// Outbound half of a connection to the printer.
///
/// Replies do not come back through this trait; the transport pushes them
/// into a [`NotificationSender`](crate::notification::NotificationSender)
/// registered when the link was set up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Link: Send + Sync {
    /// Write a command frame to the printer's write characteristic without
    /// asking for a write acknowledgement.
    async fn write_no_response(&self, data: &[u8]) -> Result<()>;
}
