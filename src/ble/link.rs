//! btleplug-backed [`Link`].
//!
//! Resolves the print characteristics on a connected peripheral, subscribes
//! to the notify characteristic and runs a task that forwards every
//! notification into the engine's mailbox.

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::ble::uuids::{NOTIFY_CHARACTERISTIC_UUID, WRITE_CHARACTERISTIC_UUID};
use crate::error::{Error, Result};
use crate::link::Link;
use crate::notification::NotificationSender;
use crate::utils::hex;

/// Connection to the printer's print characteristics.
pub struct BleLink {
    /// The connected peripheral.
    peripheral: Peripheral,
    /// Characteristic commands are written to.
    write_characteristic: Characteristic,
    /// Characteristic replies arrive on.
    notify_characteristic: Characteristic,
    /// Notification forwarding task.
    listener_handle: Option<JoinHandle<()>>,
}

impl BleLink {
    /// Set up the link on a connected peripheral whose services have been
    /// discovered. Notifications are delivered into `sender`.
    pub async fn open(peripheral: Peripheral, sender: NotificationSender) -> Result<Self> {
        if !peripheral.is_connected().await.unwrap_or(false) {
            return Err(Error::NotConnected);
        }

        let write_characteristic =
            Self::find_characteristic(&peripheral, WRITE_CHARACTERISTIC_UUID)?;
        let notify_characteristic =
            Self::find_characteristic(&peripheral, NOTIFY_CHARACTERISTIC_UUID)?;

        // Take the stream before subscribing so no early notification is lost.
        let mut notifications = peripheral.notifications().await.map_err(Error::Bluetooth)?;

        peripheral
            .subscribe(&notify_characteristic)
            .await
            .map_err(|e| {
                error!("Failed to start notifications: {}", e);
                Error::Bluetooth(e)
            })?;

        debug!(
            "Subscribed to notifications from {}",
            NOTIFY_CHARACTERISTIC_UUID
        );

        let handle = tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                if notification.uuid != NOTIFY_CHARACTERISTIC_UUID {
                    trace!("Ignoring notification from {}", notification.uuid);
                    continue;
                }
                debug!("Recv: {}", hex(&notification.value));
                sender.deliver(notification.value);
            }
            debug!("Notification listener stopped");
        });

        Ok(Self {
            peripheral,
            write_characteristic,
            notify_characteristic,
            listener_handle: Some(handle),
        })
    }

    /// Look up a characteristic among the discovered services.
    fn find_characteristic(peripheral: &Peripheral, uuid: Uuid) -> Result<Characteristic> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| {
                for c in peripheral.characteristics() {
                    debug!("  Available characteristic: {}", c.uuid);
                }
                Error::CharacteristicNotFound {
                    uuid: uuid.to_string(),
                }
            })
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Unsubscribe and stop forwarding notifications.
    pub async fn close(mut self) {
        if let Err(e) = self.peripheral.unsubscribe(&self.notify_characteristic).await {
            warn!("Failed to unsubscribe: {}", e);
        }
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl Link for BleLink {
    async fn write_no_response(&self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.write_characteristic, data, WriteType::WithoutResponse)
            .await
            .map_err(Error::Bluetooth)
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        if let Some(handle) = self.listener_handle.take() {
            handle.abort();
        }
    }
}
