//! High-level printer handle.
//!
//! Ties discovery, connection and the print engine together for the common
//! case of printing one label on the first printer in range.

use btleplug::platform::Peripheral;
use std::time::Duration;
use tracing::warn;

use crate::ble::connection::ConnectionManager;
use crate::ble::link::BleLink;
use crate::ble::locator::DeviceLocator;
use crate::ble::scanner::BleScanner;
use crate::ble::uuids::TARGET_NAME_PREFIXES;
use crate::engine::{EngineConfig, PrintEngine, PrintOutcome, PrintReport};
use crate::error::Result;
use crate::notification::notification_slot;
use crate::protocol::commands::encode_depth;
use crate::protocol::raster::RasterJob;

/// Discovery and connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrinterConfig {
    /// Advertised name prefixes to accept.
    pub name_prefixes: Vec<String>,
    /// How long to scan before giving up.
    pub scan_window: Duration,
    /// How long a connection attempt may take.
    pub connect_timeout: Duration,
    /// Pause between connecting and the first command.
    pub settle_delay: Duration,
    /// Print engine timings.
    pub engine: EngineConfig,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name_prefixes: TARGET_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            scan_window: DeviceLocator::DEFAULT_WINDOW,
            connect_timeout: Duration::from_secs(60),
            settle_delay: Duration::from_secs(1),
            engine: EngineConfig::default(),
        }
    }
}

impl PrinterConfig {
    /// Set the scan window.
    pub fn with_scan_window(mut self, window: Duration) -> Self {
        self.scan_window = window;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the print engine timings.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Build the locator described by this configuration.
    pub fn locator(&self) -> DeviceLocator {
        DeviceLocator::new(self.name_prefixes.clone(), self.scan_window)
    }
}

/// Prints labels on the first TEPRA Lite printer in range.
#[derive(Debug, Clone, Default)]
pub struct TepraPrinter {
    config: PrinterConfig,
}

impl TepraPrinter {
    /// Create a printer handle with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a printer handle with custom settings.
    pub fn with_config(config: PrinterConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Scan for a printer and return its peripheral.
    pub async fn discover(&self) -> Result<Peripheral> {
        let scanner = BleScanner::new().await?;

        // Subscribe first so discovery events raised as the scan starts are kept.
        let advertisements = scanner.advertisements().await?;
        scanner.start_scanning().await?;

        let found = self.config.locator().locate(advertisements).await;

        if let Err(e) = scanner.stop_scanning().await {
            warn!("Failed to stop scanning: {}", e);
        }

        found.map(|adv| adv.device)
    }

    /// Discover, connect, print one label and disconnect.
    ///
    /// Depth and raster are validated before scanning starts.
    pub async fn print(&self, depth: i32, raster: &[u8]) -> Result<PrintReport> {
        RasterJob::new(raster)?;
        encode_depth(depth)?;

        let peripheral = self.discover().await?;
        let connection = ConnectionManager::new(peripheral);
        connection.connect(self.config.connect_timeout).await?;

        let result = self.print_connected(&connection, depth, raster).await;

        if let Err(e) = connection.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }

        result
    }

    /// Same as [`print`](Self::print), flattened into a [`PrintOutcome`].
    pub async fn print_outcome(&self, depth: i32, raster: &[u8]) -> PrintOutcome {
        PrintOutcome::from(&self.print(depth, raster).await)
    }

    async fn print_connected(
        &self,
        connection: &ConnectionManager,
        depth: i32,
        raster: &[u8],
    ) -> Result<PrintReport> {
        tokio::time::sleep(self.config.settle_delay).await;

        let (sender, slot) = notification_slot();
        let link = BleLink::open(connection.peripheral().clone(), sender).await?;

        let mut engine = PrintEngine::with_config(link, slot, self.config.engine.clone());
        let result = engine.print_job(depth, raster).await;

        engine.into_link().close().await;
        result
    }
}
