//! Region resolution from the device timezone.
//!
//! The region is picked in a fixed order:
//!
//! 1. The device timezone must appear in the timezone table, otherwise there is
//!    no match at all, whatever the override or stored preference say.
//! 2. A non-empty session override wins and is consumed. `"automatic"` means
//!    the timezone-derived region.
//! 3. Otherwise the stored preference applies, with the same `"automatic"` rule.

use super::preferences::AUTOMATIC_REGION;
use serde::Deserialize;
use std::collections::HashMap;

/// Timezone id to region lookup delivered by the timezones call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimezoneTable {
    regions: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimezoneTableWire {
    Flat(HashMap<String, String>),
    Regions(Vec<RegionTimezones>),
}

#[derive(Deserialize)]
struct RegionTimezones {
    name: String,
    #[serde(default)]
    timezones: Vec<String>,
}

impl TimezoneTable {
    /// Parses either `{"<tz>": "<region>"}` or `[{"name": "<region>", "timezones": [...]}]`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let regions = match serde_json::from_str::<TimezoneTableWire>(json)? {
            TimezoneTableWire::Flat(map) => map,
            TimezoneTableWire::Regions(list) => {
                let mut map = HashMap::new();
                for region in list {
                    for tz in region.timezones {
                        map.entry(tz).or_insert_with(|| region.name.clone());
                    }
                }
                map
            }
        };
        Ok(Self { regions })
    }

    pub fn region_for(&self, timezone_id: &str) -> Option<&str> {
        self.regions.get(timezone_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TimezoneTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            regions: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One-shot region choice made by the user for the next attempt.
///
/// Owned by whoever sets it; the resolver takes it out when it is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionOverride(Option<String>);

impl RegionOverride {
    pub fn new(region: impl Into<String>) -> Self {
        let mut o = Self::default();
        o.set(region);
        o
    }

    pub fn set(&mut self, region: impl Into<String>) {
        let region = region.into();
        self.0 = (!region.trim().is_empty()).then_some(region);
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    Override,
    StoredPreference,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Concrete region to request hostnames for.
    pub region: String,
    /// Where the choice came from.
    pub source: RegionSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNotFound {
    pub timezone_id: String,
}

/// Resolves the region for this attempt.
///
/// The override is cleared whenever it was read, including when it was `"automatic"`.
/// On `RegionNotFound` the override is left untouched. The returned region is
/// always concrete, never the `"automatic"` sentinel.
pub fn resolve(
    table: &TimezoneTable,
    device_timezone_id: &str,
    region_override: &mut RegionOverride,
    stored_region: &str,
) -> Result<Resolution, RegionNotFound> {
    let derived = table
        .region_for(device_timezone_id)
        .ok_or_else(|| RegionNotFound {
            timezone_id: device_timezone_id.to_string(),
        })?;

    let (choice, source) = match region_override.take() {
        Some(choice) => (choice, RegionSource::Override),
        None => (stored_region.to_string(), RegionSource::StoredPreference),
    };

    let region = if choice == AUTOMATIC_REGION || choice.is_empty() {
        derived.to_string()
    } else {
        choice
    };

    Ok(Resolution { region, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TimezoneTable {
        [("America/Los_Angeles", "us-west"), ("America/New_York", "us-east")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_override_wins_and_is_consumed() {
        let mut session = RegionOverride::new("us-east");
        let first =
            resolve(&table(), "America/Los_Angeles", &mut session, AUTOMATIC_REGION).unwrap();
        assert_eq!(first.region, "us-east");
        assert_eq!(first.source, RegionSource::Override);
        assert!(!session.is_set());

        let second =
            resolve(&table(), "America/Los_Angeles", &mut session, AUTOMATIC_REGION).unwrap();
        assert_eq!(second.region, "us-west");
        assert_eq!(second.source, RegionSource::StoredPreference);
    }

    #[test]
    fn test_automatic_override_uses_timezone() {
        let mut session = RegionOverride::new(AUTOMATIC_REGION);
        let resolution = resolve(&table(), "America/New_York", &mut session, "eu-west").unwrap();
        assert_eq!(resolution.region, "us-east");
        assert_eq!(resolution.source, RegionSource::Override);
        assert!(!session.is_set());
    }

    #[test]
    fn test_stored_preference_verbatim() {
        let mut session = RegionOverride::default();
        let resolution = resolve(&table(), "America/New_York", &mut session, "eu-west").unwrap();
        assert_eq!(resolution.region, "eu-west");
        assert_eq!(resolution.source, RegionSource::StoredPreference);
    }

    #[test]
    fn test_unknown_timezone_is_not_found_regardless_of_choice() {
        for (session, stored) in [
            (None, AUTOMATIC_REGION),
            (Some("us-east"), AUTOMATIC_REGION),
            (Some(AUTOMATIC_REGION), "eu-west"),
            (None, "eu-west"),
        ] {
            let mut region_override = RegionOverride::default();
            if let Some(s) = session {
                region_override.set(s);
            }
            let err = resolve(&table(), "Pacific/Noop", &mut region_override, stored).unwrap_err();
            assert_eq!(err.timezone_id, "Pacific/Noop");
            assert_eq!(region_override.peek(), session);
        }
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut session = RegionOverride::new("   ");
        assert!(!session.is_set());
        let resolution = resolve(&table(), "America/New_York", &mut session, "eu-west").unwrap();
        assert_eq!(resolution.source, RegionSource::StoredPreference);
    }

    #[test]
    fn test_parse_flat_table() {
        let table = TimezoneTable::from_json(r#"{"America/New_York": "us-east"}"#).unwrap();
        assert_eq!(table.region_for("America/New_York"), Some("us-east"));
        assert!(!table.is_empty());
    }

    #[test]
    fn test_parse_region_list_first_listing_wins() {
        let json = r#"[
            {"name": "us-east", "timezones": ["America/New_York", "America/Toronto"]},
            {"name": "ca-east", "timezones": ["America/Toronto"]},
            {"name": "eu-de"}
        ]"#;
        let table = TimezoneTable::from_json(json).unwrap();
        assert_eq!(table.region_for("America/Toronto"), Some("us-east"));
        assert_eq!(table.region_for("Europe/Berlin"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimezoneTable::from_json("not json").is_err());
        assert!(TimezoneTable::from_json("42").is_err());
    }
}
