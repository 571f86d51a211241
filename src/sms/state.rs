//! Conversation session types

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// The wildcard strength accepted by the nearby-pharmacy search
pub const ANY_STRENGTH: &str = "%";

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The fixed UTC+05:30 offset all session timestamps are compared in
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("UTC+05:30 is a valid offset")
}

/// The search a user started: what and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub medicine: String,
    pub pincode: String,
}

/// Strength filter for the nearby-pharmacy search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strength {
    Exact(String),
    Any,
}

impl Strength {
    /// Value passed to the search procedure
    pub fn as_filter(&self) -> &str {
        match self {
            Strength::Exact(s) => s,
            Strength::Any => ANY_STRENGTH,
        }
    }
}

/// Arguments of one nearby-pharmacy search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub medicine: String,
    pub strength: Strength,
    pub pincode: String,
}

/// Numbered strength choices, in presentation order
///
/// Stored as a JSON object (`{"1": "250mg", "2": "500mg"}`); the entry order
/// of the object is the menu order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionsMap(Vec<(String, String)>);

impl OptionsMap {
    /// Deduplicate and sort strengths lexicographically, then number them from 1
    pub fn from_strengths<I, S>(strengths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = strengths.into_iter().map(Into::into).collect();
        Self(
            unique
                .into_iter()
                .enumerate()
                .map(|(i, strength)| ((i + 1).to_string(), strength))
                .collect(),
        )
    }

    /// Strength for a selection key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OptionsMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionsMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = OptionsMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping selection numbers to strengths")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<OptionsMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    entries.push((k, v));
                }
                // Keys are 1-based indices; restore numeric order in case the
                // store handed the object back with its keys re-sorted.
                entries.sort_by_key(|(k, _)| k.parse::<u64>().unwrap_or(u64::MAX));
                Ok(OptionsMap(entries))
            }
        }

        deserializer.deserialize_map(OptionsVisitor)
    }
}

/// A pending strength disambiguation for one phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_phone: String,
    pub context: SearchContext,
    pub options_map: OptionsMap,
    #[serde(with = "expiry_format")]
    pub expires_at: DateTime<FixedOffset>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<FixedOffset>) -> bool {
        self.expires_at.with_timezone(&ist()) < now.with_timezone(&ist())
    }
}

/// Parse a stored expiry timestamp into the fixed offset
///
/// Accepts a space or `T` separator and a trailing `Z`. Timestamps without an
/// offset carry the wall clock time they were written with, which is always
/// UTC+05:30.
pub fn parse_expiry(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let normalized = raw.trim().replacen(' ', "T", 1);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&ist()));
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| ist().from_local_datetime(&naive).single())
        .ok_or_else(|| format!("unrecognised expires_at value {raw:?}"))
}

pub mod expiry_format {
    use super::parse_expiry;
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_expiry(&raw).map_err(serde::de::Error::custom)
    }
}
