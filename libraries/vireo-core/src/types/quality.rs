/// Quality profile and device-condition types
use crate::types::{BackendKind, Resolution, StreamFormat};
use serde::{Deserialize, Serialize};

/// Network the device is currently on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Wifi,
    Cellular,
    Wired,
    #[default]
    Unknown,
}

/// Current device state, reported by the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConditions {
    /// Active network
    #[serde(default)]
    pub network: NetworkKind,

    /// Low-power / battery-saver mode
    #[serde(default)]
    pub low_power: bool,
}

impl DeviceConditions {
    pub fn new(network: NetworkKind, low_power: bool) -> Self {
        Self { network, low_power }
    }
}

/// A predicate over device conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileCondition {
    /// Device is on this network
    Network(NetworkKind),

    /// Low-power mode equals this value
    LowPower(bool),
}

impl ProfileCondition {
    pub fn matches(&self, conditions: &DeviceConditions) -> bool {
        match self {
            Self::Network(kind) => conditions.network == *kind,
            Self::LowPower(enabled) => conditions.low_power == *enabled,
        }
    }
}

/// Named configuration binding a backend to a resolution ceiling and a
/// format preference order
///
/// Supplied by settings and read-only to the engine. A profile with no
/// conditions matches any device state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Display name, also used to pick a profile explicitly
    pub name: String,

    /// Backend that plays streams selected under this profile
    #[serde(default)]
    pub backend: BackendKind,

    /// Resolution ceiling
    #[serde(default = "default_max_resolution")]
    pub max_resolution: Resolution,

    /// Acceptable formats, most preferred first
    #[serde(default = "default_formats")]
    pub formats: Vec<StreamFormat>,

    /// All must hold for the profile to auto-apply
    #[serde(default)]
    pub conditions: Vec<ProfileCondition>,
}

fn default_max_resolution() -> Resolution {
    Resolution::UHD_2160P60
}

fn default_formats() -> Vec<StreamFormat> {
    vec![
        StreamFormat::Hls,
        StreamFormat::Stream,
        StreamFormat::Avc1,
        StreamFormat::Mp4,
        StreamFormat::Av1,
        StreamFormat::Webm,
    ]
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            backend: BackendKind::default(),
            max_resolution: default_max_resolution(),
            formats: default_formats(),
            conditions: Vec::new(),
        }
    }
}

impl QualityProfile {
    /// Create a profile with default formats and no conditions
    pub fn new(name: impl Into<String>, backend: BackendKind, max_resolution: Resolution) -> Self {
        Self {
            name: name.into(),
            backend,
            max_resolution,
            formats: default_formats(),
            conditions: Vec::new(),
        }
    }

    /// Replace the format preference order
    pub fn with_formats(mut self, formats: Vec<StreamFormat>) -> Self {
        self.formats = formats;
        self
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: ProfileCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether every condition holds
    pub fn matches(&self, conditions: &DeviceConditions) -> bool {
        self.conditions.iter().all(|c| c.matches(conditions))
    }

    /// Preference rank of a format: lower is better, unlisted formats rank last
    pub fn format_rank(&self, format: StreamFormat) -> usize {
        self.formats
            .iter()
            .position(|f| *f == format)
            .unwrap_or(self.formats.len())
    }
}

/// First profile whose conditions hold for `conditions`
pub fn select_profile<'a>(
    profiles: &'a [QualityProfile],
    conditions: &DeviceConditions,
) -> Option<&'a QualityProfile> {
    profiles.iter().find(|p| p.matches(conditions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> Vec<QualityProfile> {
        vec![
            QualityProfile::new("Saver", BackendKind::Platform, Resolution::SD_480P)
                .with_condition(ProfileCondition::Network(NetworkKind::Cellular)),
            QualityProfile::new("Battery", BackendKind::Platform, Resolution::HD_720P)
                .with_condition(ProfileCondition::LowPower(true)),
            QualityProfile::new("Best", BackendKind::Library, Resolution::UHD_2160P60),
        ]
    }

    #[test]
    fn first_matching_profile_wins() {
        let profiles = profiles();

        let cellular = DeviceConditions::new(NetworkKind::Cellular, true);
        assert_eq!(select_profile(&profiles, &cellular).unwrap().name, "Saver");

        let battery = DeviceConditions::new(NetworkKind::Wifi, true);
        assert_eq!(select_profile(&profiles, &battery).unwrap().name, "Battery");

        let normal = DeviceConditions::new(NetworkKind::Wifi, false);
        assert_eq!(select_profile(&profiles, &normal).unwrap().name, "Best");
    }

    #[test]
    fn no_profiles_selects_nothing() {
        assert!(select_profile(&[], &DeviceConditions::default()).is_none());
    }

    #[test]
    fn unlisted_format_ranks_last() {
        let profile =
            QualityProfile::default().with_formats(vec![StreamFormat::Mp4, StreamFormat::Webm]);
        assert_eq!(profile.format_rank(StreamFormat::Mp4), 0);
        assert_eq!(profile.format_rank(StreamFormat::Webm), 1);
        assert_eq!(profile.format_rank(StreamFormat::Hls), 2);
        assert_eq!(profile.format_rank(StreamFormat::Unknown), 2);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{"name":"Cell","conditions":[{"network":"cellular"},{"low_power":false}]}"#;
        let profile: QualityProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.backend, BackendKind::Platform);
        assert_eq!(profile.max_resolution, Resolution::UHD_2160P60);
        assert_eq!(profile.conditions.len(), 2);
        assert!(profile.matches(&DeviceConditions::new(NetworkKind::Cellular, false)));
        assert!(!profile.matches(&DeviceConditions::new(NetworkKind::Cellular, true)));
    }
}
