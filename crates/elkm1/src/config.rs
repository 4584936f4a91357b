//! Runtime configuration and the include/exclude range grammar

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::x10::{device_index, HouseCode};
use crate::entity::EntityKind;
use crate::error::Error;

/// Default outbound rate limit, frames per second.
pub const DEFAULT_RATE_LIMIT: u32 = 10;

fn default_ratelimit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_fastload() -> bool {
    true
}

/// Full runtime configuration. Unknown keys are rejected when this is
/// deserialized from an application's config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElkConfig {
    /// Transport URL (`socket://host:port`) or serial device path
    pub host: String,

    /// Outbound frames per second
    #[serde(default = "default_ratelimit")]
    pub ratelimit: u32,

    /// Restore the JSON snapshot before the first transport read
    #[serde(default = "default_fastload")]
    pub fastload: bool,

    /// Snapshot path; fastload is skipped when unset
    #[serde(default)]
    pub fastload_file: Option<PathBuf>,

    #[serde(default)]
    pub zone: EntityFilter,
    #[serde(default)]
    pub output: EntityFilter,
    #[serde(default)]
    pub area: EntityFilter,
    #[serde(default)]
    pub keypad: EntityFilter,
    #[serde(default)]
    pub thermostat: EntityFilter,
    #[serde(default)]
    pub user: EntityFilter,
    #[serde(default)]
    pub x10: EntityFilter,
    #[serde(default)]
    pub task: EntityFilter,
    #[serde(default)]
    pub counter: EntityFilter,
    #[serde(default)]
    pub setting: EntityFilter,
}

impl ElkConfig {
    /// Configuration for `host` with every option at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ratelimit: DEFAULT_RATE_LIMIT,
            fastload: true,
            fastload_file: None,
            zone: EntityFilter::default(),
            output: EntityFilter::default(),
            area: EntityFilter::default(),
            keypad: EntityFilter::default(),
            thermostat: EntityFilter::default(),
            user: EntityFilter::default(),
            x10: EntityFilter::default(),
            task: EntityFilter::default(),
            counter: EntityFilter::default(),
            setting: EntityFilter::default(),
        }
    }

    fn filter(&self, kind: EntityKind) -> &EntityFilter {
        match kind {
            EntityKind::Zone => &self.zone,
            EntityKind::Output => &self.output,
            EntityKind::Area => &self.area,
            EntityKind::Keypad => &self.keypad,
            EntityKind::Thermostat => &self.thermostat,
            EntityKind::User => &self.user,
            EntityKind::X10 => &self.x10,
            EntityKind::Task => &self.task,
            EntityKind::Counter => &self.counter,
            EntityKind::Setting => &self.setting,
        }
    }

    /// Inclusion mask for one entity kind, indexed 0-based.
    pub fn mask(&self, kind: EntityKind) -> Result<Vec<bool>, Error> {
        self.filter(kind).mask(kind.capacity())
    }

    /// Validate everything that can fail before a connection attempt.
    pub fn validate(&self) -> Result<(), Error> {
        crate::transport::Host::parse(&self.host)?;
        if self.ratelimit == 0 {
            return Err(Error::Config("ratelimit must be at least 1".into()));
        }
        for kind in [
            EntityKind::Zone,
            EntityKind::Output,
            EntityKind::Area,
            EntityKind::Keypad,
            EntityKind::Thermostat,
            EntityKind::User,
            EntityKind::X10,
            EntityKind::Task,
            EntityKind::Counter,
            EntityKind::Setting,
        ] {
            self.mask(kind)?;
        }
        Ok(())
    }
}

/// Pre-computed inclusion masks for every entity kind.
#[derive(Debug, Clone)]
pub(crate) struct Masks {
    map: std::collections::HashMap<EntityKind, Vec<bool>>,
}

impl Masks {
    pub(crate) fn from_config(config: &ElkConfig) -> Result<Self, Error> {
        let mut map = std::collections::HashMap::new();
        for kind in [
            EntityKind::Zone,
            EntityKind::Output,
            EntityKind::Area,
            EntityKind::Keypad,
            EntityKind::Thermostat,
            EntityKind::User,
            EntityKind::X10,
            EntityKind::Task,
            EntityKind::Counter,
            EntityKind::Setting,
        ] {
            map.insert(kind, config.mask(kind)?);
        }
        Ok(Self { map })
    }

    pub(crate) fn get(&self, kind: EntityKind) -> &[bool] {
        &self.map[&kind]
    }

    pub(crate) fn included(&self, kind: EntityKind, index: usize) -> bool {
        self.map[&kind].get(index).copied().unwrap_or(false)
    }
}

/// Inclusion and exclusion lists for one entity kind.
///
/// Tokens are decimal numbers (`"7"`), decimal ranges (`"1-16"`), device
/// codes (`"C5"`), or device-code ranges (`"A1-B4"`). With no include
/// list everything is included; the exclude list always wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

static DECIMAL_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})(?:-(\d{1,3}))?$").expect("valid range regex"));
static DEVICE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Pa-p])(\d{1,2})(?:-([A-Pa-p])(\d{1,2}))?$").expect("valid device regex")
});

impl EntityFilter {
    /// Expand to a 0-based inclusion mask of `capacity` entries.
    pub fn mask(&self, capacity: usize) -> Result<Vec<bool>, Error> {
        let mut mask = vec![self.include.is_empty(); capacity];
        for token in &self.include {
            for index in parse_token(token, capacity)? {
                mask[index] = true;
            }
        }
        for token in &self.exclude {
            for index in parse_token(token, capacity)? {
                mask[index] = false;
            }
        }
        Ok(mask)
    }
}

/// Parse one range token to 0-based indices.
fn parse_token(token: &str, capacity: usize) -> Result<std::ops::RangeInclusive<usize>, Error> {
    if let Some(caps) = DECIMAL_RANGE.captures(token) {
        let start: usize = caps[1].parse().expect("digits");
        let end: usize = caps.get(2).map_or(start, |m| m.as_str().parse().expect("digits"));
        if start == 0 || end > capacity || start > end {
            return Err(Error::Config(format!(
                "range {token:?} outside 1..={capacity}"
            )));
        }
        return Ok(start - 1..=end - 1);
    }
    if let Some(caps) = DEVICE_RANGE.captures(token) {
        let start = device_token(&caps[1], &caps[2])?;
        let end = match (caps.get(3), caps.get(4)) {
            (Some(house), Some(unit)) => device_token(house.as_str(), unit.as_str())?,
            _ => start,
        };
        if start > end || end >= capacity {
            return Err(Error::Config(format!("device range {token:?} is invalid")));
        }
        return Ok(start..=end);
    }
    Err(Error::Config(format!("unrecognized range token {token:?}")))
}

fn device_token(house: &str, unit: &str) -> Result<usize, Error> {
    let house = HouseCode::from_letter(house.chars().next().expect("matched letter"))
        .ok_or_else(|| Error::Config(format!("house code {house:?} outside A..P")))?;
    let unit: u8 = unit.parse().expect("digits");
    if !(1..=16).contains(&unit) {
        return Err(Error::Config(format!("unit {unit} outside 1..=16")));
    }
    Ok(device_index(house, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_includes_everything() {
        let filter = EntityFilter::default();
        let mask = filter.mask(8).unwrap();
        assert!(mask.iter().all(|&m| m));
    }

    #[test]
    fn include_list_restricts() {
        let filter = EntityFilter {
            include: vec!["1-3".into(), "7".into()],
            exclude: vec![],
        };
        let mask = filter.mask(8).unwrap();
        assert_eq!(mask, vec![true, true, true, false, false, false, true, false]);
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = EntityFilter {
            include: vec!["1-8".into()],
            exclude: vec!["2-3".into()],
        };
        let mask = filter.mask(8).unwrap();
        assert_eq!(mask, vec![true, false, false, true, true, true, true, true]);
    }

    #[test]
    fn device_codes_map_to_flat_indices() {
        let filter = EntityFilter {
            include: vec!["A1-B4".into(), "C5".into()],
            exclude: vec![],
        };
        let mask = filter.mask(256).unwrap();
        // A1 through B4 is indices 0..=19, C5 is index 36.
        assert!(mask[0] && mask[19] && mask[36]);
        assert!(!mask[20] && !mask[35] && !mask[37]);
    }

    #[test]
    fn bad_tokens_are_config_errors() {
        for token in ["0", "9", "5-2", "Q1", "A17", "A1-", "zones"] {
            let filter = EntityFilter { include: vec![token.into()], exclude: vec![] };
            assert!(filter.mask(8).is_err(), "token {token:?}");
        }
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let raw = r#"{"host": "socket://1.2.3.4:2101", "bogus": true}"#;
        let parsed: Result<ElkConfig, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_checks_host_and_masks() {
        let mut config = ElkConfig::new("socket://1.2.3.4:2101");
        config.validate().unwrap();
        config.zone.include = vec!["500".into()];
        assert!(config.validate().is_err());
        config.zone.include.clear();
        config.ratelimit = 0;
        assert!(config.validate().is_err());
    }
}
