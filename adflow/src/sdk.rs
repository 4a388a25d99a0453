//! The seam to the ad SDK being driven.

use adflow_bus::{AdFormat, AdUnitId, SdkCallbacks};

use crate::config::AdConfig;

/// Imperative triggers of an ad SDK.
///
/// Triggers are fire-and-forget: results arrive later as notifications on
/// the [`SdkCallbacks`] sink handed over through
/// [`attach_callbacks`](AdSdk::attach_callbacks). Implementations may
/// report callbacks from any thread, and may report them from inside a
/// trigger call.
pub trait AdSdk: Send + Sync + 'static {
    /// Called once, when the orchestrator is created.
    fn attach_callbacks(&self, callbacks: SdkCallbacks);

    fn initialize(&self, config: &AdConfig);

    fn report_application_open(&self);

    fn enable_location_support(&self, enabled: bool);

    /// Prepare the SDK's plugins for the given ad units before a load.
    fn load_plugins(&self, format: AdFormat, ad_units: &[AdUnitId]);

    fn request_load(&self, format: AdFormat, ad_unit: &AdUnitId);

    fn show(&self, format: AdFormat, ad_unit: &AdUnitId);
}
