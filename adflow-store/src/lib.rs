//! Observable UI state for the ad orchestrator
//!
//! The orchestrator never touches widgets. Everything a presentation layer
//! needs is published here:
//!
//! - **Gates**: one enabled/disabled flag per button (initialize, load and
//!   show for each ad format)
//! - **Counters**: monotonic tallies such as completed rewarded videos
//! - **Labels**: short display strings such as the last show outcome
//!
//! Values are read directly, or watched and consumed through a blocking
//! iterator that only yields actual changes.
//!
//! # Iteration Patterns
//!
//! ```rust,ignore
//! // Blocking iteration on a dedicated UI thread
//! for event in store.iter() {
//!     redraw(event.key, event.value);
//! }
//!
//! // Once per frame, buttons only, newest value per gate
//! for (key, value) in store.iter().only(Gate::ALL).drain_latest() {
//!     redraw(key, value);
//! }
//! ```

pub mod event;
pub mod iter;
pub mod key;
pub mod store;

pub use event::{ChangeEvent, Value};
pub use iter::{ChangeIterator, TimeoutIter, TryIter};
pub use key::{CounterId, Gate, LabelId, ValueKey};
pub use store::UiStore;
