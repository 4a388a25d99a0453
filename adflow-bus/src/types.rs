//! Core types shared by the bus, the store and the orchestrator.

use serde::{Deserialize, Serialize};

/// Ad formats the orchestrator drives.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    /// Full-screen ad that can be dismissed, clicked or expire
    Interstitial,
    /// Video ad that grants a reward when watched to the end
    RewardedVideo,
}

impl AdFormat {
    /// Every format, in slot order.
    pub const ALL: [AdFormat; 2] = [AdFormat::Interstitial, AdFormat::RewardedVideo];

    /// Short lowercase name used in logs and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdFormat::Interstitial => "interstitial",
            AdFormat::RewardedVideo => "rewarded_video",
        }
    }
}

impl std::fmt::Display for AdFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque ad-unit identifier issued by the ad network.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdUnitId(pub String);

impl AdUnitId {
    /// Create a new ad-unit ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ad-unit ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for AdUnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AdUnitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for AdUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reward granted by a rewarded-video ad.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    /// Currency or item key, as configured on the ad network
    pub key: String,
    /// Amount granted
    pub amount: f32,
}

impl Reward {
    pub fn new(key: impl Into<String>, amount: f32) -> Self {
        Self {
            key: key.into(),
            amount,
        }
    }
}

impl std::fmt::Display for Reward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x{}", self.key, self.amount)
    }
}

/// One SDK callback hook.
///
/// Every callback the SDK fires maps to exactly one channel. Per-format
/// channels carry the format the SDK reported the event for.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Channel {
    SdkInitialized,
    Loaded(AdFormat),
    LoadFailed(AdFormat),
    Shown(AdFormat),
    Dismissed(AdFormat),
    Expired(AdFormat),
    Clicked(AdFormat),
    Closed(AdFormat),
    FailedToPlay(AdFormat),
    RewardReceived(AdFormat),
}

impl Channel {
    /// The ad format this channel belongs to, if any.
    pub fn format(&self) -> Option<AdFormat> {
        match *self {
            Channel::SdkInitialized => None,
            Channel::Loaded(f)
            | Channel::LoadFailed(f)
            | Channel::Shown(f)
            | Channel::Dismissed(f)
            | Channel::Expired(f)
            | Channel::Clicked(f)
            | Channel::Closed(f)
            | Channel::FailedToPlay(f)
            | Channel::RewardReceived(f) => Some(f),
        }
    }

    /// Event name without the format, e.g. `"load_failed"`.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::SdkInitialized => "sdk_initialized",
            Channel::Loaded(_) => "loaded",
            Channel::LoadFailed(_) => "load_failed",
            Channel::Shown(_) => "shown",
            Channel::Dismissed(_) => "dismissed",
            Channel::Expired(_) => "expired",
            Channel::Clicked(_) => "clicked",
            Channel::Closed(_) => "closed",
            Channel::FailedToPlay(_) => "failed_to_play",
            Channel::RewardReceived(_) => "reward_received",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.format() {
            Some(format) => write!(f, "{}.{}", format, self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// Data carried by a notification besides its channel and ad unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Error(String),
    Reward(Reward),
}

/// A single callback fired by the SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Hook the callback arrived on
    pub channel: Channel,
    /// Ad unit the SDK reported the callback for
    pub ad_unit: AdUnitId,
    pub payload: Payload,
}

impl Notification {
    /// Create a notification without payload.
    pub fn new(channel: Channel, ad_unit: impl Into<AdUnitId>) -> Self {
        Self {
            channel,
            ad_unit: ad_unit.into(),
            payload: Payload::Empty,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn sdk_initialized(ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::SdkInitialized, ad_unit)
    }

    pub fn loaded(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Loaded(format), ad_unit)
    }

    pub fn load_failed(
        format: AdFormat,
        ad_unit: impl Into<AdUnitId>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(Channel::LoadFailed(format), ad_unit).with_payload(Payload::Error(error.into()))
    }

    pub fn shown(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Shown(format), ad_unit)
    }

    pub fn dismissed(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Dismissed(format), ad_unit)
    }

    pub fn expired(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Expired(format), ad_unit)
    }

    pub fn clicked(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Clicked(format), ad_unit)
    }

    pub fn closed(format: AdFormat, ad_unit: impl Into<AdUnitId>) -> Self {
        Self::new(Channel::Closed(format), ad_unit)
    }

    pub fn failed_to_play(
        format: AdFormat,
        ad_unit: impl Into<AdUnitId>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(Channel::FailedToPlay(format), ad_unit)
            .with_payload(Payload::Error(error.into()))
    }

    pub fn reward_received(
        format: AdFormat,
        ad_unit: impl Into<AdUnitId>,
        key: impl Into<String>,
        amount: f32,
    ) -> Self {
        Self::new(Channel::RewardReceived(format), ad_unit)
            .with_payload(Payload::Reward(Reward::new(key, amount)))
    }

    /// Error string carried by load-failed and failed-to-play callbacks.
    pub fn error(&self) -> Option<&str> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Reward carried by reward-received callbacks.
    pub fn reward(&self) -> Option<&Reward> {
        match &self.payload {
            Payload::Reward(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::SdkInitialized.to_string(), "sdk_initialized");
        assert_eq!(
            Channel::LoadFailed(AdFormat::Interstitial).to_string(),
            "interstitial.load_failed"
        );
        assert_eq!(
            Channel::Closed(AdFormat::RewardedVideo).to_string(),
            "rewarded_video.closed"
        );
    }

    #[test]
    fn test_channel_format() {
        assert_eq!(Channel::SdkInitialized.format(), None);
        assert_eq!(
            Channel::Shown(AdFormat::RewardedVideo).format(),
            Some(AdFormat::RewardedVideo)
        );
    }

    #[test]
    fn test_notification_payload_accessors() {
        let failed = Notification::load_failed(AdFormat::Interstitial, "unit-1", "no fill");
        assert_eq!(failed.error(), Some("no fill"));
        assert!(failed.reward().is_none());

        let reward = Notification::reward_received(AdFormat::RewardedVideo, "unit-2", "coins", 10.0);
        assert_eq!(reward.reward(), Some(&Reward::new("coins", 10.0)));
        assert!(reward.error().is_none());

        let loaded = Notification::loaded(AdFormat::Interstitial, "unit-1");
        assert_eq!(loaded.payload, Payload::Empty);
        assert_eq!(loaded.ad_unit.as_str(), "unit-1");
    }

    #[test]
    fn test_ad_format_serde_names() {
        assert_eq!(AdFormat::RewardedVideo.as_str(), "rewarded_video");
        assert_eq!(AdFormat::Interstitial.to_string(), "interstitial");
    }

    #[test]
    fn test_ad_unit_id_is_empty() {
        assert!(AdUnitId::new("  ").is_empty());
        assert!(!AdUnitId::from("abc").is_empty());
    }
}
