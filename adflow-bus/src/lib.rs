//! # adflow-bus
//!
//! Notification plumbing between an ad SDK's callback hooks and the
//! orchestrator that drives it.
//!
//! # Overview
//!
//! - [`EventBus`]: the single owner of the SDK's callback hooks. Handlers
//!   subscribe per (channel, ad unit) and are reference counted per channel.
//! - [`CallbackBridge`] / [`SdkCallbacks`]: an ordered hand-off that carries
//!   callbacks fired on SDK threads onto the runtime running the bus.
//! - [`wait_first`]: the "first of N" race every load and show step is built
//!   from, with a [`CancelScope`] to release pending waits.
//!
//! # Example
//!
//! ```rust
//! use adflow_bus::{wait_first, AdFormat, CancelScope, Channel, EventBus, Notification, UnitFilter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let scope = CancelScope::new();
//! let unit = UnitFilter::Only("banner-1".into());
//!
//! let race = wait_first(
//!     [
//!         bus.stream(Channel::Loaded(AdFormat::Interstitial), unit.clone()),
//!         bus.stream(Channel::LoadFailed(AdFormat::Interstitial), unit),
//!     ],
//!     &scope.token(),
//! );
//!
//! bus.dispatch(&Notification::load_failed(AdFormat::Interstitial, "banner-1", "no fill"));
//!
//! let (index, notification) = race.await.unwrap();
//! assert_eq!(index, 1);
//! assert_eq!(notification.error(), Some("no fill"));
//! assert_eq!(bus.active_subscriptions(), 0);
//! # }
//! ```

pub mod bridge;
pub mod bus;
pub mod error;
pub mod race;
pub mod types;

pub use bridge::{CallbackBridge, SdkCallbacks};
pub use bus::{ChannelStats, EventBus, Handler, NotificationStream, SubscriptionHandle, UnitFilter};
pub use error::{BusError, RaceError, Result};
pub use race::{wait_first, wait_next, CancelScope, CancelToken, Race};
pub use types::{AdFormat, AdUnitId, Channel, Notification, Payload, Reward};
