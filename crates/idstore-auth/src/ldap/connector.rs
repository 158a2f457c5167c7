//! Directory connection seam
//!
//! The store talks to the directory only through [`DirectoryConnector`] and
//! the [`DirectoryHandle`] it returns, so the same store logic runs against
//! `ldap3` in production and an in-memory directory in tests.

use crate::ldap::error::DirectoryError;
use idstore_core::types::{SearchScope, Secret};
use idstore_core::LdapStoreConfig;
use idstore_crypto::decode_password;
use std::collections::HashMap;
use std::fmt;

/// Opens bound connections to a directory server
pub trait DirectoryConnector: Send + Sync {
    type Handle: DirectoryHandle;

    /// Connect and bind
    ///
    /// With an identity and a secret this is a simple bind; otherwise the
    /// connection stays anonymous. No retries.
    fn bind(
        &self,
        identity: Option<&str>,
        secret: Option<&Secret>,
    ) -> Result<Self::Handle, DirectoryError>;
}

/// An open, bound connection owned by a single store operation
pub trait DirectoryHandle {
    fn search(&mut self, search: &SearchDescriptor) -> Result<SearchResults, DirectoryError>;

    /// Read the given attributes of a single entry
    fn read_attributes(
        &mut self,
        dn: &str,
        attributes: &[&str],
    ) -> Result<DirectoryEntry, DirectoryError>;

    fn unbind(self) -> Result<(), DirectoryError>
    where
        Self: Sized;
}

/// Credentials for one bind, after the configured secret was decoded
#[derive(Clone, PartialEq, Eq)]
pub enum BindCredentials {
    Anonymous,
    Simple { dn: String, password: String },
}

impl BindCredentials {
    /// Check the URL and decode the secret
    ///
    /// Fails with a configuration error when no URL is configured or when
    /// the secret decodes to an empty password.
    pub fn prepare(
        config: &LdapStoreConfig,
        identity: Option<&str>,
        secret: Option<&Secret>,
    ) -> Result<Self, DirectoryError> {
        if config.url.is_empty() {
            return Err(idstore_core::Error::MissingUrl.into());
        }

        match (identity.filter(|dn| !dn.is_empty()), secret) {
            (Some(dn), Some(secret)) => {
                let key = config.password_key.as_ref().map(Secret::expose);
                let password = decode_password(secret.expose(), key)?;
                if password.is_empty() {
                    return Err(idstore_core::Error::EmptyPassword.into());
                }
                Ok(BindCredentials::Simple {
                    dn: dn.to_string(),
                    password,
                })
            }
            _ => Ok(BindCredentials::Anonymous),
        }
    }

    pub fn dn(&self) -> Option<&str> {
        match self {
            BindCredentials::Anonymous => None,
            BindCredentials::Simple { dn, .. } => Some(dn),
        }
    }
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindCredentials::Anonymous => f.write_str("Anonymous"),
            BindCredentials::Simple { dn, .. } => f
                .debug_struct("Simple")
                .field("dn", dn)
                .field("password", &"****")
                .finish(),
        }
    }
}

/// Parameters of one directory search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDescriptor {
    pub base: String,
    pub filter: String,
    pub scope: SearchScope,
    pub size_limit: i32,
    /// Server-side time limit in seconds, 0 for none
    pub time_limit: i32,
    pub attributes: Vec<String>,
}

impl SearchDescriptor {
    pub fn new(
        base: impl Into<String>,
        filter: impl Into<String>,
        scope: SearchScope,
        config: &LdapStoreConfig,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            base: base.into(),
            filter: filter.into(),
            scope,
            size_limit: config.max_results,
            time_limit: config.search_time_limit(),
            attributes,
        }
    }
}

impl fmt::Display for SearchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[scope: {}, timeLimit: {}, sizeLimit: {}, attributes: {}]",
            self.scope,
            self.time_limit,
            self.size_limit,
            self.attributes.join(",")
        )
    }
}

/// Entries returned by one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub entries: Vec<DirectoryEntry>,
    /// The size limit was hit; more entries may match than were returned
    pub truncated: bool,
}

/// A directory entry with its string attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Attribute values, matching the name case-insensitively
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(String::as_str)
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}
