//! Fetch mode configuration for Trawl.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Process-wide fetch mode.
///
/// Controls whether source drivers hit the network or read pre-recorded
/// fixtures. Decided once at startup; every search in the process uses the
/// same mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum FetchMode {
    /// Live mode - performs real HTTP requests against source sites
    #[default]
    Live,
    /// Mock mode - resolves fixture files keyed by source, media type and page
    Mock,
}

impl FetchMode {
    /// Check if running in mock mode.
    pub fn is_mock(self) -> bool {
        matches!(self, Self::Mock)
    }

    /// Check if running in live mode.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    /// Interprets a boolean-style mock switch (`TRAWL_MOCK_MODE=true`).
    ///
    /// Returns `None` for values that are neither a boolean nor a mode name.
    pub fn from_switch(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(Self::Mock),
            "0" | "false" | "no" | "off" | "" => Some(Self::Live),
            other => other.parse().ok(),
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "LIVE"),
            Self::Mock => write!(f, "MOCK"),
        }
    }
}

impl std::str::FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" | "production" | "prod" => Ok(Self::Live),
            "mock" | "fixture" | "fixtures" => Ok(Self::Mock),
            _ => Err(format!(
                "Invalid fetch mode: '{s}'. Valid options are: live, mock"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("live".parse::<FetchMode>().unwrap(), FetchMode::Live);
        assert_eq!("MOCK".parse::<FetchMode>().unwrap(), FetchMode::Mock);
        assert!("sometimes".parse::<FetchMode>().is_err());
    }

    #[test]
    fn test_switch_values() {
        assert_eq!(FetchMode::from_switch("true"), Some(FetchMode::Mock));
        assert_eq!(FetchMode::from_switch(" 0 "), Some(FetchMode::Live));
        assert_eq!(FetchMode::from_switch("mock"), Some(FetchMode::Mock));
        assert_eq!(FetchMode::from_switch("maybe"), None);
    }

    #[test]
    fn test_value_enum_names() {
        assert_eq!(
            <FetchMode as ValueEnum>::from_str("MOCK", true).unwrap(),
            FetchMode::Mock
        );
        let names: Vec<_> = FetchMode::value_variants()
            .iter()
            .filter_map(|mode| mode.to_possible_value())
            .map(|value| value.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["live", "mock"]);
    }

    #[test]
    fn test_default_is_live() {
        assert!(FetchMode::default().is_live());
        assert_eq!(FetchMode::Mock.to_string(), "MOCK");
    }
}
