//! The façade the presentation layer drives.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use adflow_bus::{AdFormat, CallbackBridge, CancelScope, EventBus, SdkCallbacks};
use adflow_store::UiStore;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::AdConfig;
use crate::error::{AdError, Result};
use crate::sdk::AdSdk;
use crate::session::{self, SessionContext};
use crate::slot::SlotTable;
use crate::state::{Outcome, SessionState};

/// Resolves when the session started by a façade operation settles.
///
/// Dropping a `Completion` does not cancel the session.
#[must_use = "a Completion does nothing unless awaited; drop it to ignore the outcome"]
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Outcome>,
    operation: &'static str,
}

impl Completion {
    /// Name of the operation this completion belongs to
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl Future for Completion {
    type Output = Result<Outcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| AdError::SessionAborted(operation)))
    }
}

/// Drives an ad SDK through initialize, load and show for the interstitial
/// and rewarded-video slots.
///
/// Every operation checks its precondition and performs its entry
/// transition before returning, so a second request for a busy slot is
/// rejected immediately. The rest of the session runs on the Tokio runtime
/// the orchestrator was created in; the operation can be called from any
/// thread.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = AdOrchestrator::new(sdk, config)?;
///
/// orchestrator.initialize()?.await?;
/// orchestrator.request_load(AdFormat::RewardedVideo)?.await?;
///
/// let outcome = orchestrator.show(AdFormat::RewardedVideo)?.await?;
/// println!("Rewarded video finished: {outcome}");
/// ```
pub struct AdOrchestrator {
    ctx: SessionContext,
    bridge: CallbackBridge,
    runtime: Handle,
}

impl AdOrchestrator {
    /// Create an orchestrator and hand the SDK its callback sink.
    ///
    /// Must be called inside a Tokio runtime; the callback bridge and every
    /// session are spawned on it.
    pub fn new(sdk: Arc<dyn AdSdk>, config: AdConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()?;

        let bus = EventBus::new();
        let bridge = CallbackBridge::spawn_on(bus.clone(), &runtime);
        sdk.attach_callbacks(bridge.callbacks());

        tracing::info!(
            game_id = %config.game_id,
            interstitial = %config.interstitial_ad_unit,
            rewarded = %config.rewarded_ad_unit,
            match_ad_unit = config.match_ad_unit,
            "Ad orchestrator created"
        );

        Ok(Self {
            ctx: SessionContext {
                bus,
                sdk,
                config: Arc::new(config),
                slots: Arc::new(SlotTable::new(UiStore::new())),
            },
            bridge,
            runtime,
        })
    }

    /// Initialize the SDK. Completes with [`Outcome::Ready`] once the SDK
    /// reports it is initialized.
    pub fn initialize(&self) -> Result<Completion> {
        let scope = CancelScope::new();
        self.ctx.slots.begin_initialize(scope.token())?;

        Ok(self.spawn(
            "initialize",
            session::initialize(self.ctx.clone(), scope),
        ))
    }

    /// Request an ad for `format`. Completes with [`Outcome::Loaded`] or a
    /// load failure.
    pub fn request_load(&self, format: AdFormat) -> Result<Completion> {
        let scope = CancelScope::new();
        self.ctx.slots.begin_load(format, scope.token())?;

        Ok(self.spawn("load", session::load(self.ctx.clone(), format, scope)))
    }

    /// Show the loaded ad for `format`. Completes with the terminal outcome
    /// of the show.
    pub fn show(&self, format: AdFormat) -> Result<Completion> {
        let scope = CancelScope::new();
        self.ctx.slots.begin_show(format, scope.token())?;

        Ok(self.spawn("show", session::show(self.ctx.clone(), format, scope)))
    }

    pub fn state(&self, format: AdFormat) -> SessionState {
        self.ctx.slots.state(format)
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.slots.is_initialized()
    }

    /// Gate flags, counters and labels for the presentation layer
    pub fn store(&self) -> &UiStore {
        self.ctx.slots.store()
    }

    pub fn bus(&self) -> &EventBus {
        &self.ctx.bus
    }

    /// Another handle to the sink the SDK reports callbacks to
    pub fn callbacks(&self) -> SdkCallbacks {
        self.bridge.callbacks()
    }

    pub fn config(&self) -> &AdConfig {
        &self.ctx.config
    }

    /// Cancel every session in flight and stop dispatching callbacks.
    ///
    /// Pending operations complete with `Failed(Cancelled)`; new ones are
    /// rejected with [`AdError::ShutDown`]. Also runs on drop.
    pub fn shutdown(&self) {
        if self.ctx.slots.close() {
            self.bridge.shutdown();
            tracing::info!("Ad orchestrator shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.ctx.slots.is_closed()
    }

    fn spawn<F>(&self, operation: &'static str, session: F) -> Completion
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            // The caller may have dropped its Completion
            let _ = tx.send(session.await);
        });
        Completion { rx, operation }
    }
}

impl Drop for AdOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AdOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdOrchestrator")
            .field("slots", &self.ctx.slots)
            .field("bus", &self.ctx.bus)
            .finish()
    }
}
