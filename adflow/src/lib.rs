//! # adflow
//!
//! Ad-lifecycle orchestration for callback-driven ad SDKs.
//!
//! An [`AdOrchestrator`] drives an [`AdSdk`] through
//! initialize → load → show → outcome for an interstitial slot and a
//! rewarded-video slot. Every step races the SDK notifications that can
//! end it, and every wait is released when its session ends.
//!
//! # Overview
//!
//! - **Single flight**: one session per slot. A second request for a busy
//!   slot is rejected with [`AdError::SlotBusy`] before anything is sent to
//!   the SDK.
//! - **Outcomes, not errors**: load and show failures complete the
//!   operation with [`Outcome::Failed`]. Errors are reserved for rejected
//!   requests and infrastructure faults.
//! - **UI contract**: button gates, the rewarded-completion counter and the
//!   last outcome label are published on a [`UiStore`] for any presentation
//!   layer to read or watch.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adflow::{AdConfig, AdFormat, AdOrchestrator, Gate, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> adflow::Result<()> {
//!     adflow::logging::init_logging_from_env().ok();
//!
//!     let config = AdConfig::from_json(include_str!("../ads.json"))?;
//!     let orchestrator = AdOrchestrator::new(Arc::new(MySdk::new()), config)?;
//!
//!     orchestrator.initialize()?.await?;
//!
//!     if orchestrator.request_load(AdFormat::RewardedVideo)?.await? == Outcome::Loaded {
//!         assert!(orchestrator.store().gate(Gate::Show(AdFormat::RewardedVideo)));
//!         let outcome = orchestrator.show(AdFormat::RewardedVideo)?.await?;
//!         println!("Rewarded video: {outcome}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod sdk;
mod session;
mod slot;
pub mod state;

pub use config::{AdConfig, SdkLogLevel};
pub use error::{AdError, Result};
pub use orchestrator::{AdOrchestrator, Completion};
pub use sdk::AdSdk;
pub use state::{CloseReason, Failure, Outcome, SessionState};

// Re-exports so applications only need this crate
pub use adflow_bus::{AdFormat, AdUnitId, EventBus, Notification, Reward, SdkCallbacks};
pub use adflow_store::{ChangeEvent, ChangeIterator, CounterId, Gate, LabelId, UiStore, Value, ValueKey};
