//! Printer discovery by advertised name.

use futures::stream::{Stream, StreamExt};
use std::time::Duration;
use tracing::{debug, info};

use crate::ble::uuids::TARGET_NAME_PREFIXES;
use crate::error::{Error, Result};

/// One advertisement seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement<D> {
    /// Device name reported by the platform, if any.
    pub name: Option<String>,
    /// Local name carried in the advertisement payload, if any.
    pub local_name: Option<String>,
    /// Device address as a string.
    pub address: String,
    /// Transport handle for connecting to the device.
    pub device: D,
}

/// Picks the first advertisement whose name starts with a known prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLocator {
    prefixes: Vec<String>,
    window: Duration,
}

impl Default for DeviceLocator {
    fn default() -> Self {
        Self::new(
            TARGET_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            Self::DEFAULT_WINDOW,
        )
    }
}

impl DeviceLocator {
    /// Default scan window (30 seconds).
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

    /// Create a locator for the given name prefixes and scan window.
    pub fn new(prefixes: Vec<String>, window: Duration) -> Self {
        Self { prefixes, window }
    }

    /// The scan window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check whether either name starts with one of the target prefixes.
    pub fn matches(&self, name: Option<&str>, local_name: Option<&str>) -> bool {
        [name, local_name]
            .into_iter()
            .flatten()
            .any(|n| self.prefixes.iter().any(|p| n.starts_with(p.as_str())))
    }

    /// Return the first matching advertisement from `advertisements`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if nothing matches within the
    /// window or the stream ends first.
    pub async fn locate<S, D>(&self, advertisements: S) -> Result<Advertisement<D>>
    where
        S: Stream<Item = Advertisement<D>> + Unpin,
    {
        let mut advertisements = advertisements;

        let search = async {
            while let Some(adv) = advertisements.next().await {
                if self.matches(adv.name.as_deref(), adv.local_name.as_deref()) {
                    return Some(adv);
                }
                debug!(
                    "Ignoring {} ({:?} / {:?})",
                    adv.address, adv.name, adv.local_name
                );
            }
            None
        };

        match tokio::time::timeout(self.window, search).await {
            Ok(Some(adv)) => {
                info!(
                    "Found {} ({})",
                    adv.local_name.as_deref().or(adv.name.as_deref()).unwrap_or("?"),
                    adv.address
                );
                Ok(adv)
            }
            _ => Err(Error::DeviceNotFound {
                window: self.window,
            }),
        }
    }
}
