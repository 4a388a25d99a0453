//! Keys for the values the store exposes to the presentation layer.

use adflow_bus::AdFormat;

/// One user action whose button the presentation layer enables or disables.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Gate {
    InitializeSdk,
    Load(AdFormat),
    Show(AdFormat),
}

impl Gate {
    /// Every gate, in button order.
    pub const ALL: [Gate; 5] = [
        Gate::InitializeSdk,
        Gate::Load(AdFormat::Interstitial),
        Gate::Show(AdFormat::Interstitial),
        Gate::Load(AdFormat::RewardedVideo),
        Gate::Show(AdFormat::RewardedVideo),
    ];
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::InitializeSdk => f.write_str("initialize_sdk"),
            Gate::Load(format) => write!(f, "load_{format}"),
            Gate::Show(format) => write!(f, "show_{format}"),
        }
    }
}

/// Name of a monotonic counter.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct CounterId(&'static str);

impl CounterId {
    /// Rewarded videos watched to the end
    pub const REWARDED_COMPLETIONS: CounterId = CounterId("rewarded_completions");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for CounterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Name of a display string.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct LabelId(&'static str);

impl LabelId {
    /// Terminal label of the most recent show session
    pub const LAST_OUTCOME: LabelId = LabelId("last_outcome");
    /// Reward granted by the most recent completed rewarded video
    pub const LAST_REWARD: LabelId = LabelId("last_reward");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Any value the store holds.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ValueKey {
    Gate(Gate),
    Counter(CounterId),
    Label(LabelId),
}

impl From<Gate> for ValueKey {
    fn from(gate: Gate) -> Self {
        ValueKey::Gate(gate)
    }
}

impl From<CounterId> for ValueKey {
    fn from(id: CounterId) -> Self {
        ValueKey::Counter(id)
    }
}

impl From<LabelId> for ValueKey {
    fn from(id: LabelId) -> Self {
        ValueKey::Label(id)
    }
}

impl std::fmt::Display for ValueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKey::Gate(gate) => write!(f, "gate:{gate}"),
            ValueKey::Counter(id) => write!(f, "counter:{id}"),
            ValueKey::Label(id) => write!(f, "label:{id}"),
        }
    }
}
