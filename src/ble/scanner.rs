//! BLE scanning functionality.
//!
//! Wraps a btleplug adapter and turns its central events into a stream of
//! [`Advertisement`]s for the [`DeviceLocator`](crate::ble::DeviceLocator).

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::ble::locator::Advertisement;
use crate::error::{Error, Result};

/// BLE scanner for discovering printers.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
    /// Whether scanning is currently active.
    is_scanning: Arc<RwLock<bool>>,
}

impl BleScanner {
    /// Create a new BLE scanner on the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            is_scanning: Arc::new(RwLock::new(false)),
        }
    }

    /// Start scanning.
    ///
    /// # Errors
    ///
    /// Returns an error if scanning cannot be started.
    pub async fn start_scanning(&self) -> Result<()> {
        if *self.is_scanning.read() {
            debug!("Already scanning, ignoring start request");
            return Ok(());
        }

        info!("Scanning for Bluetooth devices...");

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        *self.is_scanning.write() = true;

        Ok(())
    }

    /// Stop scanning.
    pub async fn stop_scanning(&self) -> Result<()> {
        if !*self.is_scanning.read() {
            debug!("Not scanning, ignoring stop request");
            return Ok(());
        }

        info!("Stopping BLE scan");

        *self.is_scanning.write() = false;

        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        Ok(())
    }

    /// Check if currently scanning.
    pub fn is_scanning(&self) -> bool {
        *self.is_scanning.read()
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Stream of advertisements seen by the adapter.
    ///
    /// Every discovery or update event yields one item, so a device shows up
    /// repeatedly while it keeps advertising.
    pub async fn advertisements(&self) -> Result<BoxStream<'static, Advertisement<Peripheral>>> {
        let events = self.adapter.events().await.map_err(Error::Bluetooth)?;
        let adapter = self.adapter.clone();

        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        Self::advertisement_for(&adapter, id).await
                    }
                    _ => None,
                }
            }
        });

        Ok(stream.boxed())
    }

    /// Read a peripheral's properties into an advertisement.
    async fn advertisement_for(
        adapter: &Adapter,
        id: PeripheralId,
    ) -> Option<Advertisement<Peripheral>> {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return None,
        };

        trace!(
            "Advertisement from {}: {:?}",
            properties.address,
            properties.local_name
        );

        // btleplug surfaces a single advertised name per peripheral.
        Some(Advertisement {
            name: None,
            local_name: properties.local_name,
            address: properties.address.to_string(),
            device: peripheral,
        })
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        *self.is_scanning.write() = false;
    }
}
