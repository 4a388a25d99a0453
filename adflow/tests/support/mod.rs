//! Scripted fake SDK for driving the orchestrator in tests.
//!
//! Every trigger call is recorded. Responses can be queued per trigger and
//! are reported through the callback sink from inside the trigger call,
//! the way a synchronous SDK would.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use adflow::{AdConfig, AdFormat, AdOrchestrator, AdSdk, AdUnitId, Notification, SdkCallbacks};
use parking_lot::Mutex;

pub const GAME_ID: &str = "3456789";
pub const INTERSTITIAL_UNIT: &str = "inter-unit-1";
pub const REWARDED_UNIT: &str = "reward-unit-1";

#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    AttachCallbacks,
    Initialize(String),
    ReportApplicationOpen,
    EnableLocationSupport(bool),
    LoadPlugins(AdFormat, Vec<AdUnitId>),
    RequestLoad(AdFormat, AdUnitId),
    Show(AdFormat, AdUnitId),
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Trigger {
    Initialize,
    RequestLoad(AdFormat),
    Show(AdFormat),
}

#[derive(Default)]
pub struct FakeSdk {
    calls: Mutex<Vec<SdkCall>>,
    callbacks: Mutex<Option<SdkCallbacks>>,
    script: Mutex<HashMap<Trigger, VecDeque<Vec<Notification>>>>,
}

impl FakeSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the notifications reported the next time `trigger` is called.
    pub fn respond(&self, trigger: Trigger, notifications: Vec<Notification>) {
        self.script
            .lock()
            .entry(trigger)
            .or_default()
            .push_back(notifications);
    }

    /// Report a notification right now, as if from an SDK thread.
    pub fn emit(&self, notification: Notification) {
        let callbacks = self.callbacks.lock().clone();
        callbacks
            .expect("callbacks attached")
            .notify(notification)
            .expect("bridge running");
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&SdkCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: SdkCall) {
        self.calls.lock().push(call);
    }

    fn fire(&self, trigger: Trigger) {
        let response = self
            .script
            .lock()
            .get_mut(&trigger)
            .and_then(|queue| queue.pop_front());

        for notification in response.unwrap_or_default() {
            self.emit(notification);
        }
    }
}

impl AdSdk for FakeSdk {
    fn attach_callbacks(&self, callbacks: SdkCallbacks) {
        self.record(SdkCall::AttachCallbacks);
        *self.callbacks.lock() = Some(callbacks);
    }

    fn initialize(&self, config: &AdConfig) {
        self.record(SdkCall::Initialize(config.game_id.clone()));
        self.fire(Trigger::Initialize);
    }

    fn report_application_open(&self) {
        self.record(SdkCall::ReportApplicationOpen);
    }

    fn enable_location_support(&self, enabled: bool) {
        self.record(SdkCall::EnableLocationSupport(enabled));
    }

    fn load_plugins(&self, format: AdFormat, ad_units: &[AdUnitId]) {
        self.record(SdkCall::LoadPlugins(format, ad_units.to_vec()));
    }

    fn request_load(&self, format: AdFormat, ad_unit: &AdUnitId) {
        self.record(SdkCall::RequestLoad(format, ad_unit.clone()));
        self.fire(Trigger::RequestLoad(format));
    }

    fn show(&self, format: AdFormat, ad_unit: &AdUnitId) {
        self.record(SdkCall::Show(format, ad_unit.clone()));
        self.fire(Trigger::Show(format));
    }
}

pub fn config() -> AdConfig {
    AdConfig::new(GAME_ID, INTERSTITIAL_UNIT, REWARDED_UNIT)
}

pub fn unit(format: AdFormat) -> &'static str {
    match format {
        AdFormat::Interstitial => INTERSTITIAL_UNIT,
        AdFormat::RewardedVideo => REWARDED_UNIT,
    }
}

/// An orchestrator over a fresh fake SDK.
pub fn orchestrator_with(config: AdConfig) -> (Arc<FakeSdk>, AdOrchestrator) {
    let sdk = FakeSdk::new();
    let orchestrator =
        AdOrchestrator::new(Arc::clone(&sdk) as Arc<dyn AdSdk>, config).expect("valid config");
    (sdk, orchestrator)
}

/// An orchestrator whose SDK has finished initializing.
pub async fn initialized() -> (Arc<FakeSdk>, AdOrchestrator) {
    initialized_with(config()).await
}

pub async fn initialized_with(config: AdConfig) -> (Arc<FakeSdk>, AdOrchestrator) {
    let (sdk, orchestrator) = orchestrator_with(config);
    sdk.respond(Trigger::Initialize, vec![Notification::sdk_initialized(INTERSTITIAL_UNIT)]);
    let outcome = orchestrator.initialize().unwrap().await.unwrap();
    assert_eq!(outcome, adflow::Outcome::Ready);
    (sdk, orchestrator)
}

/// An orchestrator with a loaded ad for `format`.
pub async fn loaded(format: AdFormat) -> (Arc<FakeSdk>, AdOrchestrator) {
    let (sdk, orchestrator) = initialized().await;
    sdk.respond(
        Trigger::RequestLoad(format),
        vec![Notification::loaded(format, unit(format))],
    );
    let outcome = orchestrator.request_load(format).unwrap().await.unwrap();
    assert_eq!(outcome, adflow::Outcome::Loaded);
    (sdk, orchestrator)
}

/// Yield to the runtime until `condition` holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
