//! Per-format slot table
//!
//! Holds the state of each ad slot and the SDK's initialization phase, and
//! is the only writer of gate flags. Gates are derived from state on every
//! transition:
//!
//! - `initialize-sdk` is enabled while initialization has not started
//! - `load(f)` is enabled while the slot accepts a load
//! - `show(f)` is enabled while the slot holds a loaded ad
//!
//! Once the table is closed every gate stays off.
//!
//! Precondition checks and entry transitions happen under the slot's lock,
//! so at most one session per slot is ever in flight.

use std::sync::atomic::{AtomicBool, Ordering};

use adflow_bus::{AdFormat, CancelToken};
use adflow_store::{Gate, UiStore};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{AdError, Result};
use crate::state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SdkPhase {
    Idle,
    Initializing,
    Ready,
}

#[derive(Debug)]
struct SdkStatus {
    phase: SdkPhase,
    token: Option<CancelToken>,
}

#[derive(Debug)]
struct Slot {
    state: SessionState,
    /// Cancels the session in flight, if any
    token: Option<CancelToken>,
}

pub(crate) struct SlotTable {
    slots: DashMap<AdFormat, Slot>,
    sdk: Mutex<SdkStatus>,
    store: UiStore,
    closed: AtomicBool,
}

impl SlotTable {
    pub(crate) fn new(store: UiStore) -> Self {
        let slots = DashMap::new();
        for format in AdFormat::ALL {
            apply_gates(&store, format, &SessionState::Idle);
            slots.insert(
                format,
                Slot {
                    state: SessionState::Idle,
                    token: None,
                },
            );
        }
        store.set_gate(Gate::InitializeSdk, true);

        Self {
            slots,
            sdk: Mutex::new(SdkStatus {
                phase: SdkPhase::Idle,
                token: None,
            }),
            store,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn store(&self) -> &UiStore {
        &self.store
    }

    pub(crate) fn state(&self, format: AdFormat) -> SessionState {
        self.slots
            .get(&format)
            .map(|slot| slot.state.clone())
            .unwrap_or(SessionState::Idle)
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.sdk.lock().phase == SdkPhase::Ready
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idle -> Initializing for the SDK and every slot.
    pub(crate) fn begin_initialize(&self, token: CancelToken) -> Result<()> {
        {
            let mut sdk = self.sdk.lock();
            if self.is_closed() {
                return Err(AdError::ShutDown);
            }
            if sdk.phase != SdkPhase::Idle {
                return Err(AdError::AlreadyInitialized);
            }
            sdk.phase = SdkPhase::Initializing;
            sdk.token = Some(token);
            self.store.set_gate(Gate::InitializeSdk, false);
        }

        for format in AdFormat::ALL {
            self.transition(format, SessionState::Initializing);
        }
        Ok(())
    }

    /// Initializing -> Ready for the SDK and every slot.
    ///
    /// Returns false, leaving the SDK Initializing, if the table was closed
    /// first.
    pub(crate) fn finish_initialize(&self) -> bool {
        {
            let mut sdk = self.sdk.lock();
            if self.is_closed() {
                sdk.token = None;
                return false;
            }
            sdk.phase = SdkPhase::Ready;
            sdk.token = None;
        }

        for format in AdFormat::ALL {
            self.transition(format, SessionState::Ready);
        }
        true
    }

    /// The initialization wait was cancelled; the SDK stays Initializing.
    pub(crate) fn abort_initialize(&self) {
        self.sdk.lock().token = None;
    }

    /// Enter LoadPending if the slot accepts a load.
    pub(crate) fn begin_load(&self, format: AdFormat, token: CancelToken) -> Result<()> {
        self.ensure_ready(format)?;

        let mut slot = self
            .slots
            .get_mut(&format)
            .ok_or(AdError::NotInitialized(format))?;
        if self.is_closed() {
            return Err(AdError::ShutDown);
        }
        if !slot.state.accepts_load() {
            return Err(AdError::SlotBusy {
                format,
                state: slot.state.clone(),
            });
        }

        self.enter(format, &mut slot, SessionState::LoadPending);
        slot.token = Some(token);
        Ok(())
    }

    /// Enter ShowPending if the slot holds a loaded ad.
    pub(crate) fn begin_show(&self, format: AdFormat, token: CancelToken) -> Result<()> {
        self.ensure_ready(format)?;

        let mut slot = self
            .slots
            .get_mut(&format)
            .ok_or(AdError::NotInitialized(format))?;
        if self.is_closed() {
            return Err(AdError::ShutDown);
        }
        if !slot.state.accepts_show() {
            return Err(if slot.state.is_in_flight() {
                AdError::SlotBusy {
                    format,
                    state: slot.state.clone(),
                }
            } else {
                AdError::NotLoaded(format)
            });
        }

        self.enter(format, &mut slot, SessionState::ShowPending);
        slot.token = Some(token);
        Ok(())
    }

    /// Intermediate transition of a running session.
    pub(crate) fn transition(&self, format: AdFormat, next: SessionState) {
        if let Some(mut slot) = self.slots.get_mut(&format) {
            self.enter(format, &mut slot, next);
        }
    }

    /// Final transition of a session; the slot no longer has anything to
    /// cancel.
    pub(crate) fn finish(&self, format: AdFormat, next: SessionState) {
        if let Some(mut slot) = self.slots.get_mut(&format) {
            slot.token = None;
            self.enter(format, &mut slot, next);
        }
    }

    /// Reject further requests and cancel every session in flight.
    ///
    /// Returns false if the table was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let mut tokens = Vec::new();
        {
            let mut sdk = self.sdk.lock();
            tokens.extend(sdk.token.take());
            self.store.set_gate(Gate::InitializeSdk, false);
        }
        for mut slot in self.slots.iter_mut() {
            tokens.extend(slot.token.take());
            close_gates(&self.store, *slot.key());
        }

        // Cancel outside the locks: teardowns unsubscribe from the bus
        for token in tokens {
            token.cancel();
        }
        true
    }

    fn ensure_ready(&self, format: AdFormat) -> Result<()> {
        if self.is_closed() {
            return Err(AdError::ShutDown);
        }
        if self.sdk.lock().phase != SdkPhase::Ready {
            return Err(AdError::NotInitialized(format));
        }
        Ok(())
    }

    fn enter(&self, format: AdFormat, slot: &mut Slot, next: SessionState) {
        tracing::debug!(%format, from = %slot.state, to = %next, "Slot transition");
        slot.state = next;
        if self.is_closed() {
            close_gates(&self.store, format);
        } else {
            apply_gates(&self.store, format, &slot.state);
        }
    }
}

impl std::fmt::Debug for SlotTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotTable")
            .field("sdk", &self.sdk.lock().phase)
            .field("interstitial", &self.state(AdFormat::Interstitial))
            .field("rewarded_video", &self.state(AdFormat::RewardedVideo))
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn apply_gates(store: &UiStore, format: AdFormat, state: &SessionState) {
    store.set_gate(Gate::Load(format), state.accepts_load());
    store.set_gate(Gate::Show(format), state.accepts_show());
}

fn close_gates(store: &UiStore, format: AdFormat) {
    store.set_gate(Gate::Load(format), false);
    store.set_gate(Gate::Show(format), false);
}
