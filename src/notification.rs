//! Single-slot notification mailbox.
//!
//! The printer answers commands with unsolicited notifications that carry no
//! request identifier. The engine therefore keeps exactly one outstanding
//! waited request and attributes whatever arrives next to it. The mailbox
//! holds only the most recent payload; a newer notification overwrites an
//! unread one.
//!
//! [`notification_slot`] returns the two halves: a [`NotificationSender`] for
//! the transport's notification callback and a [`NotificationSlot`] owned by
//! the engine. Neither half is `Clone`, so there is one writer and one reader.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::utils::hex;

struct Shared {
    /// `None` is the awaiting state.
    value: Mutex<Option<Bytes>>,
    notify: Notify,
}

/// Create a connected sender/slot pair, initially awaiting.
pub fn notification_slot() -> (NotificationSender, NotificationSlot) {
    let shared = Arc::new(Shared {
        value: Mutex::new(None),
        notify: Notify::new(),
    });

    (
        NotificationSender {
            shared: shared.clone(),
        },
        NotificationSlot { shared },
    )
}

/// Writing half of the mailbox, fed by the transport.
pub struct NotificationSender {
    shared: Arc<Shared>,
}

impl NotificationSender {
    /// Store a payload, replacing whatever is in the slot.
    pub fn deliver(&self, payload: impl Into<Bytes>) {
        let payload = payload.into();
        trace!("Notification delivered: {}", hex(&payload));
        *self.shared.value.lock() = Some(payload);
        self.shared.notify.notify_one();
    }
}

impl std::fmt::Debug for NotificationSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSender").finish_non_exhaustive()
    }
}

/// Reading half of the mailbox, owned by the print engine.
pub struct NotificationSlot {
    shared: Arc<Shared>,
}

impl NotificationSlot {
    /// Return the slot to the awaiting state.
    pub fn reset(&mut self) {
        *self.shared.value.lock() = None;
    }

    /// Current payload, if one has arrived since the last reset.
    pub fn peek(&self) -> Option<Bytes> {
        self.shared.value.lock().clone()
    }

    /// Check whether the slot is awaiting a notification.
    pub fn is_awaiting(&self) -> bool {
        self.shared.value.lock().is_none()
    }

    /// Wait until a payload is present or `timeout` elapses.
    ///
    /// The payload stays in the slot until the next [`reset`](Self::reset).
    pub async fn wait_for_value(&mut self, timeout: Duration) -> Option<Bytes> {
        let deadline = Instant::now() + timeout;

        loop {
            // Register interest before checking so a delivery in between
            // leaves a permit behind instead of being missed.
            let notified = self.shared.notify.notified();

            if let Some(value) = self.peek() {
                return Some(value);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.peek();
            }
        }
    }
}

impl std::fmt::Debug for NotificationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSlot")
            .field("awaiting", &self.is_awaiting())
            .finish()
    }
}
