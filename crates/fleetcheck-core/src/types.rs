//! Domain types shared by the discovery client and the health engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer};

/// Metadata key that identifies the physical host behind an announcement.
pub const SERVER_TOKEN_KEY: &str = "server-token";

// ── Announcement ───────────────────────────────────────────────────

/// One service instance registration, as served by the discovery `/state`
/// endpoint.
///
/// Missing and `null` string fields both read as empty.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub announcement_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub service_type: String,
    /// Base address the health endpoint is resolved against.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub service_uri: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment: String,
    /// Opaque registration metadata. Values are arbitrary JSON.
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Announcement {
    /// Look up a metadata entry that holds a string.
    ///
    /// Returns `None` when metadata is absent, the key is missing, or the
    /// value is not a JSON string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }

    /// The dedup token naming the host backing this announcement.
    ///
    /// An empty token is treated as absent.
    pub fn server_token(&self) -> Option<&str> {
        self.metadata_str(SERVER_TOKEN_KEY).filter(|t| !t.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Severity ───────────────────────────────────────────────────────

/// Outcome severity. Declaration order is the aggregation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    Ok,
    Unknown,
    Warn,
    Crit,
}

impl Severity {
    /// The worse of two severities.
    pub fn worse(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Plugin status label.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Unknown => "UNKNOWN",
            Severity::Warn => "WARNING",
            Severity::Crit => "CRITICAL",
        }
    }

    /// Monitoring-plugin exit code for this severity.
    pub fn exit_code(self) -> u8 {
        match self {
            Severity::Ok => 0,
            Severity::Warn => 1,
            Severity::Crit => 2,
            Severity::Unknown => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Measurement ────────────────────────────────────────────────────

/// A named numeric measurement carried alongside a check result.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
    /// Unit of measure; empty for plain counts.
    pub unit: String,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Measurement {
    /// Perfdata form: `name=value[unit]`, quoting names with spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.contains([' ', '=', '\'']) {
            write!(f, "'{}'", self.name.replace('\'', "''"))?;
        } else {
            f.write_str(&self.name)?;
        }
        write!(f, "={}{}", self.value, self.unit)
    }
}
