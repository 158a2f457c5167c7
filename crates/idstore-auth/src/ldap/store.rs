//! LDAP identity store
//!
//! Validates caller credentials against a directory server and resolves the
//! caller's groups. Every call opens its own connections and unbinds them
//! before returning; nothing but the configuration is shared between calls.

use crate::ldap::caller::{bind_admin, CallerResolver};
use crate::ldap::client::LdapConnector;
use crate::ldap::connector::{DirectoryConnector, DirectoryHandle};
use crate::ldap::error::StoreError;
use crate::ldap::groups::GroupResolver;
use crate::metrics::{record_bind, record_validation, record_validation_error, BindKind};
use idstore_core::types::{Credential, CredentialKind, ValidationResult, ValidationType};
use idstore_core::{LdapStoreConfig, DN_ATTRIBUTE};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Dispatch};

static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ldaps?://").expect("URL scheme pattern is valid"));

/// Identity store backed by an LDAP directory
pub struct LdapIdentityStore<C = LdapConnector> {
    config: Arc<LdapStoreConfig>,
    connector: C,
    dispatch: Option<Dispatch>,
}

impl LdapIdentityStore<LdapConnector> {
    /// Create a store that connects with `ldap3`
    pub fn new(config: LdapStoreConfig) -> idstore_core::Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            connector: LdapConnector::new(config.clone()),
            config,
            dispatch: None,
        })
    }
}

impl<C: DirectoryConnector> LdapIdentityStore<C> {
    pub fn with_connector(config: LdapStoreConfig, connector: C) -> idstore_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            connector,
            dispatch: None,
        })
    }

    /// Emit the store's events to `dispatch` instead of the current default
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn config(&self) -> &LdapStoreConfig {
        &self.config
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn validation_types(&self) -> &BTreeSet<ValidationType> {
        &self.config.use_for
    }

    /// Realm of validated callers: the directory host and port
    pub fn realm(&self) -> String {
        let realm = URL_SCHEME.replace(&self.config.url, "");
        let realm = realm.as_ref();
        realm.strip_suffix('/').unwrap_or(realm).to_string()
    }

    /// Validate a credential
    ///
    /// Wrong secrets and unknown callers give an invalid result. An `Err`
    /// means the store itself could not do its job: broken configuration,
    /// a failed administrative bind or a failed search.
    ///
    /// Caller passwords are decoded like configured secrets, so an `{xor}`
    /// or `{aes}` encoded password is accepted and a plain password that
    /// starts with one of those tags cannot be used.
    pub fn validate(&self, credential: &Credential) -> Result<ValidationResult, StoreError> {
        self.observe("validate", || {
            let result = self.validate_credential(credential);
            match &result {
                Ok(validation) => record_validation(validation.status()),
                Err(_) => record_validation_error(),
            }
            result
        })
    }

    /// Groups of a caller validated earlier, possibly by another store
    ///
    /// Empty unless this store provides groups or when the caller cannot be
    /// found in the directory.
    pub fn caller_groups(&self, result: &ValidationResult) -> Result<HashSet<String>, StoreError> {
        self.observe("caller_groups", || {
            if !self.config.provides_groups() {
                return Ok(HashSet::new());
            }

            let caller_dn = match result.caller_dn().filter(|dn| !dn.is_empty()) {
                Some(dn) => dn.to_string(),
                None => match self.resolve_dn(result.caller_name().unwrap_or_default())? {
                    Some(dn) => dn,
                    None => return Ok(HashSet::new()),
                },
            };

            self.groups_of_dn(&caller_dn)
        })
    }

    /// DN and groups of a caller, without checking any credential
    ///
    /// `None` when the caller cannot be found. Stores not used to provide
    /// groups return the DN with no groups.
    pub fn groups_for(
        &self,
        caller: &str,
    ) -> Result<Option<(String, HashSet<String>)>, StoreError> {
        self.observe("groups_for", || {
            let Some(caller_dn) = self.resolve_dn(caller)? else {
                return Ok(None);
            };
            let groups = if self.config.provides_groups() {
                self.groups_of_dn(&caller_dn)?
            } else {
                HashSet::new()
            };
            Ok(Some((caller_dn, groups)))
        })
    }

    fn resolve_dn(&self, caller: &str) -> Result<Option<String>, StoreError> {
        if caller.trim().is_empty() {
            return Ok(None);
        }
        let dn = CallerResolver::new(&self.config, &self.connector).resolve(caller)?;
        if dn.is_none() {
            debug!(caller, "Caller not found, no groups");
        }
        Ok(dn)
    }

    fn groups_of_dn(&self, caller_dn: &str) -> Result<HashSet<String>, StoreError> {
        let mut handle = bind_admin(&self.config, &self.connector)?;
        let groups = GroupResolver::new(&self.config).resolve_groups(&mut handle, caller_dn);
        unbind(handle);
        groups
    }

    fn validate_credential(&self, credential: &Credential) -> Result<ValidationResult, StoreError> {
        if !self.config.use_for.contains(&ValidationType::Validate) {
            debug!("Store is not used for validation");
            return Ok(ValidationResult::not_validated());
        }
        if !credential.is_valid() {
            debug!("Credential is marked invalid");
            return Ok(ValidationResult::not_validated());
        }

        let (caller, password) = match credential.kind() {
            CredentialKind::UsernamePassword { caller, password } => (caller.as_str(), Some(password)),
            CredentialKind::CallerOnly { caller } => (caller.as_str(), None),
            CredentialKind::RememberMe { .. } => {
                debug!("Unsupported credential kind");
                return Ok(ValidationResult::not_validated());
            }
        };

        if caller.trim().is_empty() {
            warn!("Empty caller name");
            return Ok(ValidationResult::invalid());
        }

        let caller_dn = match CallerResolver::new(&self.config, &self.connector).resolve(caller)? {
            Some(dn) => dn,
            None => {
                debug!(caller, "Caller could not be resolved");
                return Ok(ValidationResult::invalid());
            }
        };

        let mut handle = match password {
            Some(password) => match self.connector.bind(Some(caller_dn.as_str()), Some(password)) {
                Ok(handle) => {
                    record_bind(BindKind::Caller, true);
                    handle
                }
                Err(e) if e.is_configuration() && !e.rejects_secret() => {
                    record_bind(BindKind::Caller, false);
                    return Err(StoreError::Configuration(e));
                }
                Err(e) => {
                    record_bind(BindKind::Caller, false);
                    debug!(dn = %caller_dn, error = %e, "Caller bind failed");
                    return Ok(ValidationResult::invalid());
                }
            },
            None => bind_admin(&self.config, &self.connector)?,
        };

        let result = self.resolve_caller(&mut handle, caller_dn);
        unbind(handle);
        result
    }

    /// Display name and groups of an authenticated caller
    fn resolve_caller<H: DirectoryHandle>(
        &self,
        handle: &mut H,
        caller_dn: String,
    ) -> Result<ValidationResult, StoreError> {
        let Some(caller_name) = self.display_name(handle, &caller_dn) else {
            return Ok(ValidationResult::invalid());
        };

        let groups = if self.config.provides_groups() {
            GroupResolver::new(&self.config).resolve_groups(handle, &caller_dn)?
        } else {
            HashSet::new()
        };

        Ok(ValidationResult::valid(
            self.realm(),
            caller_name,
            caller_dn.as_str(),
            caller_dn.as_str(),
            groups,
        ))
    }

    fn display_name<H: DirectoryHandle>(&self, handle: &mut H, caller_dn: &str) -> Option<String> {
        let attribute = self.config.caller_name_attribute.as_str();
        if attribute.eq_ignore_ascii_case(DN_ATTRIBUTE) {
            return Some(caller_dn.to_string());
        }

        match handle.read_attributes(caller_dn, &[attribute]) {
            Ok(entry) => {
                let name = entry.get(attribute).and_then(|values| values.last()).cloned();
                if name.is_none() {
                    warn!(dn = caller_dn, attribute, "Caller entry has no name attribute");
                }
                name
            }
            Err(e) => {
                warn!(dn = caller_dn, attribute, error = %e, "Could not read caller name");
                None
            }
        }
    }

    fn observe<T>(&self, operation: &'static str, f: impl FnOnce() -> T) -> T {
        let run = || {
            let span = info_span!("ldap_identity_store", url = %self.config.url, operation);
            let _enter = span.enter();
            f()
        };
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, run),
            None => run(),
        }
    }
}

fn unbind<H: DirectoryHandle>(handle: H) {
    if let Err(e) = handle.unbind() {
        debug!(error = %e, "Unbind failed");
    }
}
