//! Marshaling of SDK callbacks onto the orchestrator's runtime.
//!
//! Ad SDKs fire their callbacks from whatever thread they like. The SDK is
//! handed an [`SdkCallbacks`] sink; everything pushed into it travels through
//! an unbounded channel to a single bridge task, which dispatches the
//! notifications on the bus one at a time and in arrival order.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bus::EventBus;
use crate::error::{BusError, Result};
use crate::types::Notification;

/// Thread-safe sink the SDK reports its callbacks to.
#[derive(Debug, Clone)]
pub struct SdkCallbacks {
    tx: mpsc::UnboundedSender<Notification>,
}

impl SdkCallbacks {
    /// Hand a callback over to the bridge.
    ///
    /// Never blocks. Fails only when the bridge has shut down.
    pub fn notify(&self, notification: Notification) -> Result<()> {
        self.tx.send(notification).map_err(|err| BusError::BridgeClosed {
            channel: err.0.channel,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The task that drains [`SdkCallbacks`] into an [`EventBus`].
///
/// The task stops when every `SdkCallbacks` clone is dropped, or when the
/// bridge is shut down.
pub struct CallbackBridge {
    callbacks: SdkCallbacks,
    task: JoinHandle<()>,
}

impl CallbackBridge {
    /// Spawn the bridge task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(bus: EventBus) -> Self {
        Self::spawn_on(bus, &tokio::runtime::Handle::current())
    }

    /// Spawn the bridge task on the given runtime.
    pub fn spawn_on(bus: EventBus, runtime: &tokio::runtime::Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        let task = runtime.spawn(async move {
            while let Some(notification) = rx.recv().await {
                let delivered = bus.dispatch(&notification);
                tracing::trace!(
                    channel = %notification.channel,
                    ad_unit = %notification.ad_unit,
                    delivered,
                    "Dispatched SDK callback"
                );
            }
            tracing::debug!("Callback bridge stopped");
        });

        Self {
            callbacks: SdkCallbacks { tx },
            task,
        }
    }

    /// A sink to give to the SDK.
    pub fn callbacks(&self) -> SdkCallbacks {
        self.callbacks.clone()
    }

    /// Stop dispatching. Callbacks reported afterwards fail with
    /// [`BusError::BridgeClosed`].
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CallbackBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}
