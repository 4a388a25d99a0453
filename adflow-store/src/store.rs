//! Gate flags, counters and labels with change detection
//!
//! `UiStore` is the contract between the orchestrator and whatever draws
//! the buttons. The orchestrator writes; the presentation layer reads the
//! current values or watches them through [`UiStore::iter`].

use std::collections::{HashMap, HashSet};
use std::sync::{mpsc, Arc, Mutex, RwLock};

use crate::event::{ChangeEvent, Value};
use crate::iter::ChangeIterator;
use crate::key::{CounterId, Gate, LabelId, ValueKey};

#[derive(Debug, Default)]
struct Values {
    gates: HashMap<Gate, bool>,
    counters: HashMap<CounterId, u64>,
    labels: HashMap<LabelId, String>,
}

#[derive(Debug, Default)]
struct Watched {
    keys: HashSet<ValueKey>,
    all: bool,
}

impl Watched {
    fn contains(&self, key: &ValueKey) -> bool {
        self.all || self.keys.contains(key)
    }
}

/// Observable values for the presentation layer
///
/// Gates start disabled, counters at zero and labels unset. Cloning the
/// store shares the underlying values and the change queue.
///
/// # Example
///
/// ```rust
/// use adflow_store::{ChangeEvent, CounterId, Gate, UiStore, Value};
///
/// let store = UiStore::new();
/// store.watch(Gate::InitializeSdk);
///
/// assert!(store.set_gate(Gate::InitializeSdk, true));
/// assert!(!store.set_gate(Gate::InitializeSdk, true));
///
/// assert_eq!(store.increment(CounterId::REWARDED_COMPLETIONS), 1);
///
/// // Only the watched gate produced an event, and only once
/// let events: Vec<ChangeEvent> = store.iter().try_iter().collect();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].value, Value::Flag(true));
/// ```
#[derive(Clone)]
pub struct UiStore {
    values: Arc<RwLock<Values>>,

    watched: Arc<RwLock<Watched>>,

    /// Channel sender for change events
    event_tx: mpsc::Sender<ChangeEvent>,

    /// Channel receiver for change events (wrapped for cloning)
    event_rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl UiStore {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            values: Arc::new(RwLock::new(Values::default())),
            watched: Arc::new(RwLock::new(Watched::default())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Whether the button for `gate` is enabled
    pub fn gate(&self, gate: Gate) -> bool {
        self.values
            .read()
            .map(|v| v.gates.get(&gate).copied().unwrap_or(false))
            .unwrap_or(false)
    }

    /// Enable or disable a gate, returning whether the value changed
    pub fn set_gate(&self, gate: Gate, enabled: bool) -> bool {
        let Ok(mut values) = self.values.write() else {
            return false;
        };
        let current = values.gates.get(&gate).copied().unwrap_or(false);
        if current == enabled {
            return false;
        }
        values.gates.insert(gate, enabled);
        self.maybe_emit(ValueKey::Gate(gate), Value::Flag(enabled));
        true
    }

    /// Snapshot of every gate, in [`Gate::ALL`] order
    pub fn gates(&self) -> Vec<(Gate, bool)> {
        Gate::ALL.iter().map(|g| (*g, self.gate(*g))).collect()
    }

    /// Current value of a counter; zero if never incremented
    pub fn counter(&self, id: CounterId) -> u64 {
        self.values
            .read()
            .map(|v| v.counters.get(&id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Add one to a counter and return the new value
    pub fn increment(&self, id: CounterId) -> u64 {
        let Ok(mut values) = self.values.write() else {
            return 0;
        };
        let count = values.counters.entry(id).or_insert(0);
        *count += 1;
        let value = *count;
        self.maybe_emit(ValueKey::Counter(id), Value::Count(value));
        value
    }

    pub fn label(&self, id: LabelId) -> Option<String> {
        self.values.read().ok()?.labels.get(&id).cloned()
    }

    /// Set a label, returning whether the text changed
    pub fn set_label(&self, id: LabelId, text: impl Into<String>) -> bool {
        let text = text.into();
        let Ok(mut values) = self.values.write() else {
            return false;
        };
        if values.labels.get(&id) == Some(&text) {
            return false;
        }
        values.labels.insert(id, text.clone());
        self.maybe_emit(ValueKey::Label(id), Value::Text(text));
        true
    }

    /// Register interest in a value
    ///
    /// After watching, changes to this value will appear in `iter()`.
    pub fn watch(&self, key: impl Into<ValueKey>) {
        if let Ok(mut watched) = self.watched.write() {
            watched.keys.insert(key.into());
        }
    }

    /// Register interest in every value the store holds
    pub fn watch_all(&self) {
        if let Ok(mut watched) = self.watched.write() {
            watched.all = true;
        }
    }

    /// Unregister interest in a value
    ///
    /// Has no effect on a key covered only by [`UiStore::watch_all`].
    pub fn unwatch(&self, key: impl Into<ValueKey>) {
        if let Ok(mut watched) = self.watched.write() {
            watched.keys.remove(&key.into());
        }
    }

    pub fn is_watched(&self, key: impl Into<ValueKey>) -> bool {
        let key = key.into();
        self.watched
            .read()
            .map(|w| w.contains(&key))
            .unwrap_or(false)
    }

    /// Create a blocking iterator over change events
    ///
    /// Only emits events for values that have been watched.
    pub fn iter(&self) -> ChangeIterator {
        ChangeIterator::new(Arc::clone(&self.event_rx))
    }

    // Called with the values write lock held so queued events follow the
    // order the changes were applied in.
    fn maybe_emit(&self, key: ValueKey, value: Value) {
        if self.is_watched(key) {
            let _ = self.event_tx.send(ChangeEvent::new(key, value));
        }
    }
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("UiStore");
        if let Ok(values) = self.values.read() {
            debug
                .field("gates", &values.gates)
                .field("counters", &values.counters)
                .field("labels", &values.labels);
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adflow_bus::AdFormat;
    use std::thread;

    #[test]
    fn test_gates_start_disabled() {
        let store = UiStore::new();
        assert!(store.gates().iter().all(|(_, enabled)| !enabled));
    }

    #[test]
    fn test_set_gate_detects_change() {
        let store = UiStore::new();
        let gate = Gate::Load(AdFormat::Interstitial);

        assert!(!store.set_gate(gate, false));
        assert!(store.set_gate(gate, true));
        assert!(!store.set_gate(gate, true));
        assert!(store.gate(gate));
        assert!(!store.gate(Gate::Load(AdFormat::RewardedVideo)));
    }

    #[test]
    fn test_unwatched_changes_emit_nothing() {
        let store = UiStore::new();
        store.set_gate(Gate::InitializeSdk, true);
        store.increment(CounterId::REWARDED_COMPLETIONS);
        store.set_label(LabelId::LAST_OUTCOME, "completed");

        assert!(store.iter().try_recv().is_none());
    }

    #[test]
    fn test_watch_all_emits_in_change_order() {
        let store = UiStore::new();
        store.watch_all();

        store.set_gate(Gate::Load(AdFormat::RewardedVideo), true);
        store.set_gate(Gate::Load(AdFormat::RewardedVideo), false);
        store.set_gate(Gate::Show(AdFormat::RewardedVideo), true);
        store.increment(CounterId::REWARDED_COMPLETIONS);
        store.set_label(LabelId::LAST_REWARD, "coins x10");

        let events: Vec<_> = store.iter().try_iter().collect();
        assert_eq!(
            events,
            vec![
                ChangeEvent::new(Gate::Load(AdFormat::RewardedVideo).into(), Value::Flag(true)),
                ChangeEvent::new(Gate::Load(AdFormat::RewardedVideo).into(), Value::Flag(false)),
                ChangeEvent::new(Gate::Show(AdFormat::RewardedVideo).into(), Value::Flag(true)),
                ChangeEvent::new(CounterId::REWARDED_COMPLETIONS.into(), Value::Count(1)),
                ChangeEvent::new(LabelId::LAST_REWARD.into(), Value::Text("coins x10".into())),
            ]
        );
    }

    #[test]
    fn test_unwatch_stops_events() {
        let store = UiStore::new();
        store.watch(LabelId::LAST_OUTCOME);
        assert!(store.is_watched(LabelId::LAST_OUTCOME));

        store.set_label(LabelId::LAST_OUTCOME, "dismissed");
        store.unwatch(LabelId::LAST_OUTCOME);
        store.set_label(LabelId::LAST_OUTCOME, "clicked");

        let events: Vec<_> = store.iter().try_iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(store.label(LabelId::LAST_OUTCOME).as_deref(), Some("clicked"));
    }

    #[test]
    fn test_same_label_is_not_a_change() {
        let store = UiStore::new();
        assert!(store.set_label(LabelId::LAST_OUTCOME, "completed"));
        assert!(!store.set_label(LabelId::LAST_OUTCOME, "completed"));
        assert!(store.label(LabelId::LAST_REWARD).is_none());
    }

    #[test]
    fn test_counter_increments_from_many_threads() {
        let store = UiStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        store.increment(CounterId::REWARDED_COMPLETIONS);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.counter(CounterId::REWARDED_COMPLETIONS), 800);
        assert_eq!(store.counter(CounterId::new("other")), 0);
    }
}
