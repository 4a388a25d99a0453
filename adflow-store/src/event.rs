//! Change events for store values
//!
//! When a watched value actually changes, a `ChangeEvent` is emitted carrying
//! the key and the new value.

use std::time::Instant;

use crate::key::ValueKey;

/// New value carried by a change event.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Flag(bool),
    Count(u64),
    Text(String),
}

/// A change event emitted when a watched value changes
///
/// Events arrive in the order the changes were made, so a consumer can
/// replay gate flips exactly as the orchestrator applied them.
///
/// # Example
///
/// ```rust,ignore
/// for event in store.iter().try_iter() {
///     if let (ValueKey::Gate(gate), Value::Flag(enabled)) = (event.key, &event.value) {
///         button(gate).set_interactable(*enabled);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: ValueKey,
    pub value: Value,

    /// When the change was made
    pub timestamp: Instant,
}

impl ChangeEvent {
    pub fn new(key: ValueKey, value: Value) -> Self {
        Self {
            key,
            value,
            timestamp: Instant::now(),
        }
    }
}

impl PartialEq for ChangeEvent {
    fn eq(&self, other: &Self) -> bool {
        // Timestamp not included in equality
        self.key == other.key && self.value == other.value
    }
}
