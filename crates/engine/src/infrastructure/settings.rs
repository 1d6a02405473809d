//! Environment-backed runtime settings.
//!
//! Every field has a default, so a bare environment gives a working setup
//! against a local appliance with factory credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

use gatewatch_domain::{DescriptionMatch, RequestDescription};

use crate::use_cases::polling::{PollConfigError, PollSettings};

/// Default ManageIQ base URL.
pub const DEFAULT_MANAGEIQ_URL: &str = "https://localhost";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub manageiq_url: String,
    pub manageiq_user: String,
    pub manageiq_password: String,
    /// Upper bound for provisioning approval waits.
    pub provision_timeout_secs: u64,
    /// Upper bound for retirement approval waits.
    pub retirement_timeout_secs: u64,
    /// Upper bound for each migration plan milestone.
    pub migration_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Per-request HTTP timeout.
    pub http_timeout_secs: u64,
    /// Match request descriptions by substring rather than equality.
    pub partial_match: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            manageiq_url: DEFAULT_MANAGEIQ_URL.to_string(),
            manageiq_user: "admin".to_string(),
            manageiq_password: "smartvm".to_string(),
            provision_timeout_secs: 600,
            retirement_timeout_secs: 300,
            migration_timeout_secs: 3600,
            poll_interval_secs: 5,
            http_timeout_secs: 30,
            partial_match: true,
        }
    }
}

impl fmt::Debug for WatchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSettings")
            .field("manageiq_url", &self.manageiq_url)
            .field("manageiq_user", &self.manageiq_user)
            .field("manageiq_password", &"<redacted>")
            .field("provision_timeout_secs", &self.provision_timeout_secs)
            .field("retirement_timeout_secs", &self.retirement_timeout_secs)
            .field("migration_timeout_secs", &self.migration_timeout_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("partial_match", &self.partial_match)
            .finish()
    }
}

impl WatchSettings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            manageiq_url: lookup("MANAGEIQ_URL").unwrap_or(defaults.manageiq_url),
            manageiq_user: lookup("MANAGEIQ_USER").unwrap_or(defaults.manageiq_user),
            manageiq_password: lookup("MANAGEIQ_PASSWORD").unwrap_or(defaults.manageiq_password),
            provision_timeout_secs: parse_or(
                &lookup,
                "GATEWATCH_PROVISION_TIMEOUT_SECS",
                defaults.provision_timeout_secs,
            ),
            retirement_timeout_secs: parse_or(
                &lookup,
                "GATEWATCH_RETIREMENT_TIMEOUT_SECS",
                defaults.retirement_timeout_secs,
            ),
            migration_timeout_secs: parse_or(
                &lookup,
                "GATEWATCH_MIGRATION_TIMEOUT_SECS",
                defaults.migration_timeout_secs,
            ),
            poll_interval_secs: parse_or(
                &lookup,
                "GATEWATCH_POLL_INTERVAL_SECS",
                defaults.poll_interval_secs,
            ),
            http_timeout_secs: parse_or(
                &lookup,
                "GATEWATCH_HTTP_TIMEOUT_SECS",
                defaults.http_timeout_secs,
            ),
            partial_match: parse_or(&lookup, "GATEWATCH_PARTIAL_MATCH", defaults.partial_match),
        }
    }

    pub fn provision_polling(&self) -> Result<PollSettings, PollConfigError> {
        PollSettings::from_secs(self.provision_timeout_secs, self.poll_interval_secs)
    }

    pub fn retirement_polling(&self) -> Result<PollSettings, PollConfigError> {
        PollSettings::from_secs(self.retirement_timeout_secs, self.poll_interval_secs)
    }

    pub fn migration_polling(&self) -> Result<PollSettings, PollConfigError> {
        PollSettings::from_secs(self.migration_timeout_secs, self.poll_interval_secs)
    }

    /// Bounds for waiting on `description`: retirement requests get the
    /// retirement timeout, everything else the provisioning one.
    pub fn polling_for(
        &self,
        description: &RequestDescription,
    ) -> Result<PollSettings, PollConfigError> {
        if description.is_retirement() {
            self.retirement_polling()
        } else {
            self.provision_polling()
        }
    }

    pub fn description_match(&self) -> DescriptionMatch {
        if self.partial_match {
            DescriptionMatch::Partial
        } else {
            DescriptionMatch::Exact
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    default = %default,
                    "Invalid setting, using default"
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = WatchSettings::from_lookup(|_| None);
        assert_eq!(settings, WatchSettings::default());
        assert_eq!(settings.description_match(), DescriptionMatch::Partial);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = WatchSettings::from_lookup(lookup_from(&[
            ("MANAGEIQ_URL", "https://cfme.example.com"),
            ("GATEWATCH_POLL_INTERVAL_SECS", "2"),
            ("GATEWATCH_PARTIAL_MATCH", "false"),
        ]));

        assert_eq!(settings.manageiq_url, "https://cfme.example.com");
        assert_eq!(settings.poll_interval_secs, 2);
        assert_eq!(settings.description_match(), DescriptionMatch::Exact);
    }

    #[test]
    fn invalid_number_falls_back_to_default() {
        let settings = WatchSettings::from_lookup(lookup_from(&[(
            "GATEWATCH_PROVISION_TIMEOUT_SECS",
            "ten minutes",
        )]));
        assert_eq!(settings.provision_timeout_secs, 600);
    }

    #[test]
    fn retirement_requests_use_retirement_timeout() {
        let settings = WatchSettings::default();
        let retire = RequestDescription::new("Service Retire for: db-tier").unwrap();
        let provision = RequestDescription::new("rhel7-small").unwrap();

        assert_eq!(
            settings.polling_for(&retire).unwrap().timeout().as_secs(),
            300
        );
        assert_eq!(
            settings.polling_for(&provision).unwrap().timeout().as_secs(),
            600
        );
    }

    #[test]
    fn migration_timeout_is_configurable() {
        let settings = WatchSettings::from_lookup(lookup_from(&[(
            "GATEWATCH_MIGRATION_TIMEOUT_SECS",
            "7200",
        )]));
        assert_eq!(
            settings.migration_polling().unwrap().timeout().as_secs(),
            7200
        );
        assert_eq!(
            WatchSettings::default()
                .migration_polling()
                .unwrap()
                .timeout()
                .as_secs(),
            3600
        );
    }

    #[test]
    fn interval_above_timeout_is_rejected() {
        let settings = WatchSettings {
            poll_interval_secs: 900,
            ..WatchSettings::default()
        };
        assert!(settings.provision_polling().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let settings = WatchSettings {
            manageiq_password: "hunter2".to_string(),
            ..WatchSettings::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("manageiq_user: \"admin\""));
    }

    #[test]
    fn deserializes_partial_documents() {
        let settings: WatchSettings =
            serde_json::from_str(r#"{"poll_interval_secs": 1}"#).unwrap();
        assert_eq!(settings.poll_interval_secs, 1);
        assert_eq!(settings.manageiq_user, "admin");
    }
}
