//! Configuration for Idstore
//!
//! Example config:
//! ```toml
//! [logging]
//! level = "info"
//!
//! [ldap]
//! url = "ldaps://ldap.example.com:636"
//! bind_dn = "cn=admin,dc=example,dc=com"
//! bind_password = "{xor}PjsyNjE="
//! caller_search_base = "ou=people,dc=example,dc=com"
//! caller_search_filter = "(&(objectClass=person)(uid=%s))"
//! group_search_base = "ou=groups,dc=example,dc=com"
//! group_search_filter = "(objectClass=groupOfNames)"
//! ```

use crate::types::{SearchScope, Secret, ValidationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdStoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ldap: LdapStoreConfig,
}

impl IdStoreConfig {
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| crate::Error::ConfigRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| crate::Error::ConfigParse(e.to_string()))
    }

    /// Load from `path` when given, otherwise from defaults, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `IDSTORE_*` environment variables.
    pub fn apply_env(&mut self) {
        let ldap = &mut self.ldap;

        if let Ok(url) = std::env::var("IDSTORE_LDAP_URL") {
            ldap.url = url;
        }
        if let Ok(dn) = std::env::var("IDSTORE_BIND_DN") {
            ldap.bind_dn = dn;
        }
        if let Ok(password) = std::env::var("IDSTORE_BIND_PASSWORD") {
            ldap.bind_password = Secret::new(password);
        }
        if let Ok(key) = std::env::var("IDSTORE_PASSWORD_KEY") {
            ldap.password_key = Some(Secret::new(key));
        }
        if let Ok(base) = std::env::var("IDSTORE_CALLER_BASE_DN") {
            ldap.caller_base_dn = base;
        }
        if let Ok(base) = std::env::var("IDSTORE_CALLER_SEARCH_BASE") {
            ldap.caller_search_base = base;
        }
        if let Ok(filter) = std::env::var("IDSTORE_CALLER_SEARCH_FILTER") {
            ldap.caller_search_filter = filter;
        }
        if let Ok(base) = std::env::var("IDSTORE_GROUP_SEARCH_BASE") {
            ldap.group_search_base = base;
        }
        if let Ok(filter) = std::env::var("IDSTORE_GROUP_SEARCH_FILTER") {
            ldap.group_search_filter = filter;
        }
        if let Ok(timeout) = std::env::var("IDSTORE_READ_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                ldap.read_timeout_ms = ms;
            }
        }
        if std::env::var("IDSTORE_START_TLS").map(|v| v == "true").unwrap_or(false) {
            ldap.start_tls = true;
        }
        if let Ok(level) = std::env::var("IDSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.logging.validate()?;
        self.ldap.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, overridden by `RUST_LOG`
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> crate::Result<()> {
        match self.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(crate::Error::InvalidConfig(format!(
                "Unknown logging format: {}",
                other
            ))),
        }
    }
}

/// LDAP identity store configuration
///
/// Every field is resolved when the store is built; the store never
/// re-reads or mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapStoreConfig {
    /// Directory URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389" or "ldaps://ldap.example.com:636"
    #[serde(default)]
    pub url: String,

    /// Upgrade plain connections with STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// DN used for administrative binds (caller and group searches)
    #[serde(default)]
    pub bind_dn: String,

    /// Password for `bind_dn`, plain or `{xor}`/`{aes}` encoded
    #[serde(default)]
    pub bind_password: Secret,

    /// Passphrase for `{aes}` encoded passwords
    #[serde(default)]
    pub password_key: Option<Secret>,

    /// Parent DN used to form caller DNs when no search base is set
    #[serde(default)]
    pub caller_base_dn: String,

    /// Attribute holding the caller name
    #[serde(default = "default_caller_name_attribute")]
    pub caller_name_attribute: String,

    /// Base DN for caller searches; empty disables searching
    #[serde(default)]
    pub caller_search_base: String,

    /// Caller search filter, `%s` or `%v` stands for the caller name
    #[serde(default)]
    pub caller_search_filter: String,

    #[serde(default)]
    pub caller_search_scope: SearchScope,

    /// Base DN for group searches
    #[serde(default)]
    pub group_search_base: String,

    /// Group search filter, `%s` or `%v` stands for the caller DN
    #[serde(default)]
    pub group_search_filter: String,

    #[serde(default)]
    pub group_search_scope: SearchScope,

    /// Attribute on group entries listing member DNs
    #[serde(default = "default_group_member_attribute")]
    pub group_member_attribute: String,

    /// Attribute on caller entries listing group DNs
    #[serde(default = "default_group_member_of_attribute")]
    pub group_member_of_attribute: String,

    /// Attribute holding the group name, or "dn"
    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,

    /// Search size limit
    #[serde(default = "default_max_results")]
    pub max_results: i32,

    /// Read timeout in milliseconds, 0 for none
    #[serde(default)]
    pub read_timeout_ms: u64,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_use_for")]
    pub use_for: BTreeSet<ValidationType>,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_caller_name_attribute() -> String {
    "uid".to_string()
}

fn default_group_member_attribute() -> String {
    "member".to_string()
}

fn default_group_member_of_attribute() -> String {
    "memberOf".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

fn default_max_results() -> i32 {
    crate::DEFAULT_MAX_RESULTS
}

fn default_priority() -> i32 {
    crate::DEFAULT_PRIORITY
}

fn default_use_for() -> BTreeSet<ValidationType> {
    [ValidationType::Validate, ValidationType::ProvideGroups]
        .into_iter()
        .collect()
}

impl Default for LdapStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            start_tls: false,
            skip_tls_verify: false,
            connect_timeout_secs: default_connect_timeout(),
            bind_dn: String::new(),
            bind_password: Secret::default(),
            password_key: None,
            caller_base_dn: String::new(),
            caller_name_attribute: default_caller_name_attribute(),
            caller_search_base: String::new(),
            caller_search_filter: String::new(),
            caller_search_scope: SearchScope::default(),
            group_search_base: String::new(),
            group_search_filter: String::new(),
            group_search_scope: SearchScope::default(),
            group_member_attribute: default_group_member_attribute(),
            group_member_of_attribute: default_group_member_of_attribute(),
            group_name_attribute: default_group_name_attribute(),
            max_results: default_max_results(),
            read_timeout_ms: 0,
            priority: default_priority(),
            use_for: default_use_for(),
        }
    }
}

impl LdapStoreConfig {
    /// Whether the URL asks for an encrypted channel from the first byte
    pub fn is_ldaps(&self) -> bool {
        self.url
            .get(..8)
            .map(|scheme| scheme.eq_ignore_ascii_case("ldaps://"))
            .unwrap_or(false)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-operation timeout; `None` when no read timeout is configured
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Server-side search time limit in whole seconds, rounded up
    pub fn search_time_limit(&self) -> i32 {
        let secs = self.read_timeout_ms.div_ceil(1000);
        i32::try_from(secs).unwrap_or(i32::MAX)
    }

    pub fn provides_groups(&self) -> bool {
        self.use_for.contains(&ValidationType::ProvideGroups)
    }

    /// Validate configuration
    ///
    /// A missing URL is not rejected here; the store reports it on the
    /// first bind.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.url.is_empty() {
            let parsed = url::Url::parse(&self.url)
                .map_err(|e| crate::Error::InvalidConfig(format!("Invalid LDAP URL: {}", e)))?;
            if !matches!(parsed.scheme(), "ldap" | "ldaps") {
                return Err(crate::Error::InvalidConfig(
                    "LDAP URL must start with ldap:// or ldaps://".into(),
                ));
            }
        }

        if self.caller_name_attribute.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Caller name attribute is required".into(),
            ));
        }

        if self.group_name_attribute.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Group name attribute is required".into(),
            ));
        }

        if self.max_results < 0 {
            return Err(crate::Error::InvalidConfig(
                "Max results must not be negative".into(),
            ));
        }

        if self.use_for.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "At least one validation type is required".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LdapStoreConfig::default();
        assert_eq!(config.caller_name_attribute, "uid");
        assert_eq!(config.group_member_of_attribute, "memberOf");
        assert_eq!(config.max_results, 1000);
        assert_eq!(config.priority, 80);
        assert!(config.provides_groups());
        assert!(config.read_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_validation() {
        let mut config = LdapStoreConfig::default();
        config.url = "http://ldap.example.com".to_string();
        assert!(config.validate().is_err());

        config.url = "ldaps://ldap.example.com:636".to_string();
        assert!(config.validate().is_ok());
        assert!(config.is_ldaps());

        config.url = "LDAP://ldap.example.com".to_string();
        assert!(!config.is_ldaps());
    }

    #[test]
    fn test_search_time_limit_rounds_up() {
        let mut config = LdapStoreConfig::default();
        assert_eq!(config.search_time_limit(), 0);

        config.read_timeout_ms = 1500;
        assert_eq!(config.search_time_limit(), 2);
        assert_eq!(config.read_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"

[ldap]
url = "ldap://localhost:389"
bind_dn = "cn=admin,dc=example,dc=com"
bind_password = "secret"
caller_search_base = "ou=people,dc=example,dc=com"
caller_search_scope = "one_level"
use_for = ["validate"]
"#
        )
        .unwrap();

        let config = IdStoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.ldap.bind_password.expose(), "secret");
        assert_eq!(config.ldap.caller_search_scope, SearchScope::OneLevel);
        assert!(!config.ldap.provides_groups());
        assert_eq!(config.ldap.group_name_attribute, "cn");
    }

    #[test]
    fn test_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ldap\nurl = ").unwrap();

        let err = IdStoreConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
