//! BLE connection management.
//!
//! Connects to a discovered printer and resolves its GATT services. There is
//! a single connection attempt bounded by a timeout; reconnecting is left to
//! the caller.

use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Connection state for a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the printer.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the printer.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Manages the connection to one printer.
pub struct ConnectionManager {
    /// The peripheral to manage.
    peripheral: Peripheral,
    /// Current connection state.
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionManager {
    /// Create a new connection manager for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Connect and discover services, giving up after `timeout`.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        let current_state = *self.state.read();

        if current_state.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        if current_state.is_transitioning() {
            return Err(Error::ConnectionFailed {
                reason: "Connection already in progress".to_string(),
            });
        }

        self.set_state(ConnectionState::Connecting);

        let attempt = async {
            if !self.peripheral.is_connected().await.unwrap_or(false) {
                self.peripheral.connect().await?;
            } else {
                info!("Peripheral already connected at BLE level");
            }
            self.peripheral.discover_services().await
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(())) => {
                info!("Connected to printer");
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                Err(Error::ConnectionFailed {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                Err(Error::ConnectionFailed {
                    reason: format!("Timed out after {:?}", timeout),
                })
            }
        }
    }

    /// Disconnect from the printer.
    pub async fn disconnect(&self) -> Result<()> {
        let current_state = *self.state.read();

        if matches!(
            current_state,
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Ok(());
        }

        self.set_state(ConnectionState::Disconnecting);

        match self.peripheral.disconnect().await {
            Ok(_) => {
                info!("Disconnected.");
                self.set_state(ConnectionState::Disconnected);
                Ok(())
            }
            Err(e) => {
                error!("Failed to disconnect: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(Error::Bluetooth(e))
            }
        }
    }

    /// Update the connection state.
    fn set_state(&self, new_state: ConnectionState) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);
        }
    }
}
