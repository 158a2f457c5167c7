//! Caller DN resolution

use crate::ldap::connector::{DirectoryConnector, DirectoryHandle, SearchDescriptor};
use crate::ldap::dn::is_valid_dn;
use crate::ldap::error::StoreError;
use crate::ldap::filter::build_filter;
use crate::metrics::{record_bind, BindKind};
use idstore_core::LdapStoreConfig;
use tracing::{debug, error, warn};

/// Resolves the DN of a caller
pub struct CallerResolver<'a, C> {
    config: &'a LdapStoreConfig,
    connector: &'a C,
}

impl<'a, C: DirectoryConnector> CallerResolver<'a, C> {
    pub fn new(config: &'a LdapStoreConfig, connector: &'a C) -> Self {
        Self { config, connector }
    }

    /// Get the caller's DN
    ///
    /// A caller name that already is a DN is returned as is. Without a
    /// caller search base the DN is formed from the caller name attribute
    /// and the caller base DN. Otherwise the directory is searched and the
    /// DN of the single match returned; no match, several matches or a
    /// result cut off by the size limit give `None`.
    pub fn resolve(&self, raw_caller: &str) -> Result<Option<String>, StoreError> {
        if is_valid_dn(raw_caller) {
            return Ok(Some(raw_caller.to_string()));
        }

        let config = self.config;
        let filter = build_filter(
            &config.caller_search_filter,
            raw_caller,
            &config.caller_name_attribute,
        );

        if config.caller_search_base.is_empty() {
            let dn = format!(
                "{}={},{}",
                config.caller_name_attribute, raw_caller, config.caller_base_dn
            );
            debug!(caller = raw_caller, dn = %dn, "Formed caller DN without search");
            return Ok(Some(dn));
        }

        let mut handle = bind_admin(config, self.connector)?;

        let search = SearchDescriptor::new(
            config.caller_search_base.as_str(),
            filter.as_str(),
            config.caller_search_scope,
            config,
            vec![config.caller_name_attribute.clone()],
        );
        debug!(base = %search.base, filter = %search.filter, controls = %search, "LDAP caller search");

        let result = handle.search(&search);
        if let Err(e) = handle.unbind() {
            debug!(error = %e, "Unbind after caller search failed");
        }

        let results = result.map_err(|source| {
            error!(
                caller = raw_caller,
                filter = %filter,
                base = %config.caller_search_base,
                error = %source,
                "Caller search failed"
            );
            StoreError::CallerSearch {
                caller: raw_caller.to_string(),
                filter: filter.clone(),
                base: config.caller_search_base.clone(),
                source,
            }
        })?;

        match (results.entries.as_slice(), results.truncated) {
            ([], false) => {
                debug!(caller = raw_caller, filter = %filter, "No caller entry found");
                Ok(None)
            }
            ([entry], false) => Ok(Some(entry.dn.clone())),
            (entries, truncated) => {
                warn!(
                    caller = raw_caller,
                    filter = %filter,
                    base = %config.caller_search_base,
                    matches = entries.len(),
                    truncated,
                    "Caller search is ambiguous, multiple entries matched"
                );
                Ok(None)
            }
        }
    }
}

/// Bind with the configured administrative identity
pub(crate) fn bind_admin<C: DirectoryConnector>(
    config: &LdapStoreConfig,
    connector: &C,
) -> Result<C::Handle, StoreError> {
    match connector.bind(Some(config.bind_dn.as_str()), Some(&config.bind_password)) {
        Ok(handle) => {
            record_bind(BindKind::Admin, true);
            Ok(handle)
        }
        Err(e) => {
            record_bind(BindKind::Admin, false);
            error!(dn = %config.bind_dn, error = %e, "Administrative bind failed");
            Err(StoreError::admin_bind(&config.bind_dn, e))
        }
    }
}
