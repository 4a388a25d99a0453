//! Configuration types for the adflow crate
//!
//! `AdConfig` carries the credentials the SDK is initialized with and the
//! ad units the two slots drive. The orchestrator reads the ad units and
//! the matching flag; everything else is passed to the SDK untouched.

use adflow_bus::{AdFormat, AdUnitId, UnitFilter};
use serde::{Deserialize, Serialize};

use crate::error::{AdError, Result};

/// Verbosity the SDK itself logs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkLogLevel {
    Debug,
    #[default]
    Info,
    None,
}

/// Configuration for the AdOrchestrator
///
/// # Example
///
/// ```rust
/// use adflow::{AdConfig, SdkLogLevel};
///
/// let config = AdConfig::from_json(
///     r#"{
///         "game_id": "3456789",
///         "interstitial_ad_unit": "inter-1",
///         "rewarded_ad_unit": "reward-1"
///     }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.log_level, SdkLogLevel::Info);
/// assert!(config.match_ad_unit);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdConfig {
    /// Game identifier registered with the ad network
    pub game_id: String,

    /// Ad unit used by the interstitial slot
    pub interstitial_ad_unit: AdUnitId,

    /// Ad unit used by the rewarded-video slot
    pub rewarded_ad_unit: AdUnitId,

    /// Default: Info
    pub log_level: SdkLogLevel,

    /// Only let notifications for a slot's own ad unit resolve its waits.
    /// When off, any ad unit on the right channel does.
    /// Default: true
    pub match_ad_unit: bool,

    /// Passed to the SDK right after initialization.
    /// Default: false
    pub location_support: bool,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            game_id: String::new(),
            interstitial_ad_unit: AdUnitId::new(""),
            rewarded_ad_unit: AdUnitId::new(""),
            log_level: SdkLogLevel::default(),
            match_ad_unit: true,
            location_support: false,
        }
    }
}

impl AdConfig {
    pub fn new(
        game_id: impl Into<String>,
        interstitial_ad_unit: impl Into<AdUnitId>,
        rewarded_ad_unit: impl Into<AdUnitId>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            interstitial_ad_unit: interstitial_ad_unit.into(),
            rewarded_ad_unit: rewarded_ad_unit.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AdConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_log_level(mut self, level: SdkLogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_match_ad_unit(mut self, enabled: bool) -> Self {
        self.match_ad_unit = enabled;
        self
    }

    pub fn with_location_support(mut self, enabled: bool) -> Self {
        self.location_support = enabled;
        self
    }

    /// The ad unit the slot for `format` drives
    pub fn ad_unit(&self, format: AdFormat) -> &AdUnitId {
        match format {
            AdFormat::Interstitial => &self.interstitial_ad_unit,
            AdFormat::RewardedVideo => &self.rewarded_ad_unit,
        }
    }

    /// Filter the slot for `format` subscribes its waits with
    pub fn unit_filter(&self, format: AdFormat) -> UnitFilter {
        if self.match_ad_unit {
            UnitFilter::Only(self.ad_unit(format).clone())
        } else {
            UnitFilter::Any
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.game_id.trim().is_empty() {
            return Err(AdError::Configuration("Game id must not be empty".to_string()));
        }

        for format in AdFormat::ALL {
            if self.ad_unit(format).is_empty() {
                return Err(AdError::Configuration(format!(
                    "Ad unit for {format} must not be empty"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdConfig {
        AdConfig::new("3456789", "inter-1", "reward-1")
    }

    #[test]
    fn test_default_config() {
        let config = AdConfig::default();
        assert!(config.match_ad_unit);
        assert!(!config.location_support);
        assert_eq!(config.log_level, SdkLogLevel::Info);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_methods() {
        let config = config()
            .with_log_level(SdkLogLevel::Debug)
            .with_match_ad_unit(false)
            .with_location_support(true);

        assert_eq!(config.log_level, SdkLogLevel::Debug);
        assert!(!config.match_ad_unit);
        assert!(config.location_support);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_blank_identifiers() {
        let mut blank_game = config();
        blank_game.game_id = "  ".to_string();
        assert!(matches!(blank_game.validate(), Err(AdError::Configuration(_))));

        let mut blank_unit = config();
        blank_unit.rewarded_ad_unit = AdUnitId::new("");
        let err = blank_unit.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Ad unit for rewarded_video must not be empty"
        );
    }

    #[test]
    fn test_unit_filter_follows_match_flag() {
        let config = config();
        assert_eq!(
            config.unit_filter(AdFormat::Interstitial),
            UnitFilter::Only(AdUnitId::new("inter-1"))
        );
        assert_eq!(
            config.with_match_ad_unit(false).unit_filter(AdFormat::RewardedVideo),
            UnitFilter::Any
        );
    }

    #[test]
    fn test_from_json() {
        let config = AdConfig::from_json(
            r#"{
                "game_id": "3456789",
                "interstitial_ad_unit": "inter-1",
                "rewarded_ad_unit": "reward-1",
                "log_level": "debug",
                "match_ad_unit": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.ad_unit(AdFormat::RewardedVideo).as_str(), "reward-1");
        assert_eq!(config.log_level, SdkLogLevel::Debug);
        assert!(!config.match_ad_unit);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            AdConfig::from_json("{ not json"),
            Err(AdError::ConfigParse(_))
        ));
        assert!(matches!(
            AdConfig::from_json(r#"{"game_id": "1"}"#),
            Err(AdError::Configuration(_))
        ));
    }

    #[test]
    fn test_serialize_round_trip_keeps_names() {
        let json = serde_json::to_value(config()).unwrap();
        assert_eq!(json["log_level"], "info");
        assert_eq!(json["interstitial_ad_unit"], "inter-1");
    }

    #[test]
    fn test_bundled_config_parses() {
        let config = AdConfig::from_json(include_str!("../ads.json")).unwrap();

        assert_eq!(config.game_id, "3456789");
        assert_eq!(config.log_level, SdkLogLevel::Debug);
        assert_eq!(
            config.ad_unit(AdFormat::RewardedVideo),
            &AdUnitId::new("Rewarded_Android")
        );
        assert!(config.match_ad_unit);
        assert!(!config.location_support);
    }
}
