//! Check configuration: raw settings, TOML config files, and validation.
//!
//! Settings arrive from two layers, command-line flags and an optional
//! TOML file. [`Settings::merge`] layers them and
//! [`CheckConfig::try_from`] validates the result before any network
//! traffic happens.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_ENDPOINT: &str = "health";
pub const DEFAULT_TIMEOUT_SECS: i64 = 5;
pub const DEFAULT_CRIT_FEWER: i64 = 1;
pub const DEFAULT_WARN_FEWER: i64 = 1;

// ── Raw settings ───────────────────────────────────────────────────

/// Unvalidated settings. Every field is optional so layers can be merged.
///
/// Keys in a config file use the long flag names:
///
/// ```toml
/// discovery = "http://discovery.example:8080"
/// service = "foo"
/// endpoint = "/health"
/// timeout = 3
/// crit-fewer = 1
/// warn-fewer = 2
/// headers = ["Accept: application/json"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub discovery: Option<String>,
    pub service: Option<String>,
    pub endpoint: Option<String>,
    pub no_healthcheck: Option<bool>,
    /// Per-probe timeout in seconds.
    pub timeout: Option<i64>,
    pub crit_fewer: Option<i64>,
    pub warn_fewer: Option<i64>,
    pub headers: Option<Vec<String>>,
    /// Whole-run deadline in seconds.
    pub deadline: Option<u64>,
    pub max_in_flight: Option<usize>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn merge(self, lower: Settings) -> Settings {
        Settings {
            discovery: self.discovery.or(lower.discovery),
            service: self.service.or(lower.service),
            endpoint: self.endpoint.or(lower.endpoint),
            no_healthcheck: self.no_healthcheck.or(lower.no_healthcheck),
            timeout: self.timeout.or(lower.timeout),
            crit_fewer: self.crit_fewer.or(lower.crit_fewer),
            warn_fewer: self.warn_fewer.or(lower.warn_fewer),
            headers: self.headers.or(lower.headers),
            deadline: self.deadline.or(lower.deadline),
            max_in_flight: self.max_in_flight.or(lower.max_in_flight),
        }
    }
}

// ── Headers ────────────────────────────────────────────────────────

/// An operator-supplied request header, parsed from `"Name: value"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl FromStr for Header {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidHeader(raw.to_string()))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(raw.to_string()))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|_| ConfigError::InvalidHeader(raw.to_string()))?;
        Ok(Header { name, value })
    }
}

/// Parse a list of `"Name: value"` strings.
pub fn parse_headers<S: AsRef<str>>(raw: &[S]) -> ConfigResult<Vec<Header>> {
    raw.iter().map(|h| h.as_ref().parse()).collect()
}

/// Append headers to `map`. Existing entries and repeated names are kept.
pub fn append_headers(map: &mut HeaderMap, headers: &[Header]) {
    map.reserve(headers.len());
    for h in headers {
        map.append(h.name.clone(), h.value.clone());
    }
}

// ── Validated config ───────────────────────────────────────────────

/// Instance-count thresholds. Zero disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    pub warn: u32,
    pub crit: u32,
}

/// A validated check configuration.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub discovery: Url,
    pub service: String,
    pub endpoint: String,
    pub skip_healthcheck: bool,
    pub probe_timeout: Duration,
    pub thresholds: Thresholds,
    pub headers: Vec<Header>,
    pub deadline: Option<Duration>,
    pub max_in_flight: Option<usize>,
}

impl TryFrom<Settings> for CheckConfig {
    type Error = ConfigError;

    fn try_from(s: Settings) -> ConfigResult<Self> {
        let discovery = s
            .discovery
            .filter(|d| !d.trim().is_empty())
            .ok_or(ConfigError::MissingDiscovery)?;
        let discovery = Url::parse(discovery.trim()).map_err(|source| {
            ConfigError::InvalidDiscoveryUrl {
                url: discovery.clone(),
                source,
            }
        })?;

        let service = s
            .service
            .filter(|svc| !svc.is_empty())
            .ok_or(ConfigError::MissingService)?;

        let timeout = s.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout <= 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let deadline = match s.deadline {
            Some(0) => return Err(ConfigError::InvalidDeadline),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        if s.max_in_flight == Some(0) {
            return Err(ConfigError::InvalidConcurrency);
        }

        // Negative thresholds mean "disabled".
        let thresholds = Thresholds {
            warn: clamp_threshold(s.warn_fewer.unwrap_or(DEFAULT_WARN_FEWER)),
            crit: clamp_threshold(s.crit_fewer.unwrap_or(DEFAULT_CRIT_FEWER)),
        };
        if thresholds.warn > 0 && thresholds.crit > 0 && thresholds.warn < thresholds.crit {
            return Err(ConfigError::ThresholdOrder {
                warn: thresholds.warn,
                crit: thresholds.crit,
            });
        }

        let headers = parse_headers(s.headers.as_deref().unwrap_or_default())?;

        Ok(CheckConfig {
            discovery,
            service,
            endpoint: s.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            skip_healthcheck: s.no_healthcheck.unwrap_or(false),
            probe_timeout: Duration::from_secs(timeout.unsigned_abs()),
            thresholds,
            headers,
            deadline,
            max_in_flight: s.max_in_flight,
        })
    }
}

fn clamp_threshold(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> Settings {
        Settings {
            discovery: Some("http://discovery.example:8080".to_string()),
            service: Some("foo".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_headers_accepts_name_value_pairs() {
        let hds = parse_headers(&["foo: bar", "baz: spam"]).unwrap();
        assert_eq!(hds.len(), 2);
        assert_eq!(hds[0].name, "foo");
        assert_eq!(hds[0].value, "bar");
        assert_eq!(hds[1].name, "baz");
        assert_eq!(hds[1].value, "spam");
    }

    #[test]
    fn parse_headers_rejects_missing_colon() {
        let err = parse_headers(&["invalid", "baz: spam"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(h) if h == "invalid"));
    }

    #[test]
    fn parse_headers_keeps_colons_in_value() {
        let hds = parse_headers(&["Authorization: Basic a:b"]).unwrap();
        assert_eq!(hds[0].value, "Basic a:b");
    }

    #[test]
    fn append_keeps_existing_and_repeated_names() {
        let hds = parse_headers(&["x-tag: a", "x-tag: b", "user-agent: other"]).unwrap();
        let mut map = HeaderMap::new();
        map.insert(http::header::USER_AGENT, HeaderValue::from_static("fleetcheck"));
        append_headers(&mut map, &hds);

        assert_eq!(map.get_all("x-tag").iter().count(), 2);
        let agents: Vec<_> = map.get_all("user-agent").iter().collect();
        assert_eq!(agents, vec!["fleetcheck", "other"]);
    }

    #[test]
    fn defaults_applied() {
        let cfg = CheckConfig::try_from(minimal()).unwrap();
        assert_eq!(cfg.endpoint, "health");
        assert_eq!(cfg.probe_timeout, Duration::from_secs(5));
        assert_eq!(cfg.thresholds, Thresholds { warn: 1, crit: 1 });
        assert!(!cfg.skip_healthcheck);
        assert!(cfg.headers.is_empty());
        assert!(cfg.deadline.is_none());
    }

    #[test]
    fn missing_discovery_and_service_rejected() {
        let err = CheckConfig::try_from(Settings {
            discovery: None,
            ..minimal()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDiscovery));

        let err = CheckConfig::try_from(Settings {
            service: Some(String::new()),
            ..minimal()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingService));
    }

    #[test]
    fn invalid_discovery_url_rejected() {
        let err = CheckConfig::try_from(Settings {
            discovery: Some("not a url".to_string()),
            ..minimal()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDiscoveryUrl { .. }));
    }

    #[test]
    fn non_positive_timeout_rejected() {
        for t in [0, -3] {
            let err = CheckConfig::try_from(Settings {
                timeout: Some(t),
                ..minimal()
            })
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout));
        }
    }

    #[test]
    fn negative_thresholds_clamp_to_disabled() {
        let cfg = CheckConfig::try_from(Settings {
            crit_fewer: Some(-1),
            warn_fewer: Some(-5),
            ..minimal()
        })
        .unwrap();
        assert_eq!(cfg.thresholds, Thresholds { warn: 0, crit: 0 });
    }

    #[test]
    fn warn_below_crit_rejected_when_both_enabled() {
        let err = CheckConfig::try_from(Settings {
            crit_fewer: Some(3),
            warn_fewer: Some(2),
            ..minimal()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOrder { warn: 2, crit: 3 }));

        // A disabled warn threshold does not conflict with crit.
        let cfg = CheckConfig::try_from(Settings {
            crit_fewer: Some(3),
            warn_fewer: Some(0),
            ..minimal()
        })
        .unwrap();
        assert_eq!(cfg.thresholds, Thresholds { warn: 0, crit: 3 });
    }

    #[test]
    fn zero_deadline_and_concurrency_rejected() {
        assert!(matches!(
            CheckConfig::try_from(Settings {
                deadline: Some(0),
                ..minimal()
            }),
            Err(ConfigError::InvalidDeadline)
        ));
        assert!(matches!(
            CheckConfig::try_from(Settings {
                max_in_flight: Some(0),
                ..minimal()
            }),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn merge_prefers_upper_layer() {
        let flags = Settings {
            service: Some("bar".to_string()),
            timeout: Some(2),
            ..Default::default()
        };
        let file = Settings {
            service: Some("foo".to_string()),
            endpoint: Some("/status".to_string()),
            ..minimal()
        };
        let merged = flags.merge(file);
        assert_eq!(merged.service.as_deref(), Some("bar"));
        assert_eq!(merged.endpoint.as_deref(), Some("/status"));
        assert_eq!(merged.timeout, Some(2));
        assert_eq!(
            merged.discovery.as_deref(),
            Some("http://discovery.example:8080")
        );
    }

    #[test]
    fn settings_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
discovery = "http://discovery.example:8080"
service = "foo"
crit-fewer = 1
warn-fewer = 2
no-healthcheck = true
headers = ["Accept: application/json"]
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.service.as_deref(), Some("foo"));
        assert_eq!(settings.warn_fewer, Some(2));
        assert_eq!(settings.no_healthcheck, Some(true));

        let cfg = CheckConfig::try_from(settings).unwrap();
        assert!(cfg.skip_healthcheck);
        assert_eq!(cfg.headers[0].name, "accept");
    }

    #[test]
    fn settings_file_errors() {
        let err = Settings::from_file(Path::new("/nonexistent/fleetcheck.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bogus-key = 1").unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
