//! LDAP client implementation
//!
//! Blocking connections through `ldap3`'s synchronous API. Supports LDAP,
//! LDAPS (SSL) and STARTTLS connections.

use crate::ldap::connector::{
    BindCredentials, DirectoryConnector, DirectoryEntry, DirectoryHandle, SearchDescriptor,
    SearchResults,
};
use crate::ldap::error::DirectoryError;
use idstore_core::types::{SearchScope, Secret};
use idstore_core::LdapStoreConfig;
use ldap3::{LdapConn, LdapConnSettings, LdapResult, Scope, SearchEntry, SearchOptions, SearchResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens one `ldap3` connection per bind
#[derive(Debug, Clone)]
pub struct LdapConnector {
    config: Arc<LdapStoreConfig>,
}

impl LdapConnector {
    pub fn new(config: Arc<LdapStoreConfig>) -> Self {
        Self { config }
    }

    /// Connection settings with proper TLS options
    fn settings(&self) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(self.config.connect_timeout())
            .set_starttls(self.config.start_tls && !self.config.is_ldaps())
            .set_no_tls_verify(self.config.skip_tls_verify)
    }
}

impl DirectoryConnector for LdapConnector {
    type Handle = LdapHandle;

    fn bind(
        &self,
        identity: Option<&str>,
        secret: Option<&Secret>,
    ) -> Result<LdapHandle, DirectoryError> {
        let credentials = BindCredentials::prepare(&self.config, identity, secret)?;

        debug!(
            dn = credentials.dn().unwrap_or(""),
            url = %self.config.url,
            tls = self.config.is_ldaps() || self.config.start_tls,
            "LDAP bind"
        );

        let mut conn = LdapConn::with_settings(self.settings(), &self.config.url)?;
        let timeout = self.config.read_timeout();

        if let BindCredentials::Simple { dn, password } = &credentials {
            if let Some(timeout) = timeout {
                conn.with_timeout(timeout);
            }
            let result = conn.simple_bind(dn, password)?;
            if let Err(e) = check(result) {
                if let Err(unbind) = conn.unbind() {
                    debug!(error = %unbind, "Unbind after failed bind failed");
                }
                return Err(e);
            }
        }

        Ok(LdapHandle {
            conn: Some(conn),
            timeout,
        })
    }
}

/// A bound `ldap3` connection, unbound on drop
pub struct LdapHandle {
    conn: Option<LdapConn>,
    timeout: Option<Duration>,
}

impl LdapHandle {
    fn conn(&mut self) -> Result<&mut LdapConn, DirectoryError> {
        let conn = self.conn.as_mut().ok_or(DirectoryError::Closed)?;
        if let Some(timeout) = self.timeout {
            conn.with_timeout(timeout);
        }
        Ok(conn)
    }
}

impl DirectoryHandle for LdapHandle {
    fn search(&mut self, search: &SearchDescriptor) -> Result<SearchResults, DirectoryError> {
        let conn = self.conn()?;
        conn.with_search_options(
            SearchOptions::new()
                .sizelimit(search.size_limit)
                .timelimit(search.time_limit),
        );

        let SearchResult(entries, result) = conn.search(
            &search.base,
            scope(search.scope),
            &search.filter,
            search.attributes.clone(),
        )?;

        let truncated = result.rc == DirectoryError::SIZE_LIMIT_EXCEEDED;
        if truncated {
            warn!(
                base = %search.base,
                filter = %search.filter,
                limit = search.size_limit,
                "Search size limit exceeded, results are partial"
            );
        } else {
            check(result)?;
        }

        Ok(SearchResults {
            entries: entries
                .into_iter()
                .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry)))
                .collect(),
            truncated,
        })
    }

    fn read_attributes(
        &mut self,
        dn: &str,
        attributes: &[&str],
    ) -> Result<DirectoryEntry, DirectoryError> {
        let conn = self.conn()?;
        let SearchResult(entries, result) = conn.search(
            dn,
            Scope::Base,
            "(objectClass=*)",
            attributes.to_vec(),
        )?;
        check(result)?;

        entries
            .into_iter()
            .next()
            .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry)))
            .ok_or_else(|| DirectoryError::NoSuchEntry(dn.to_string()))
    }

    fn unbind(mut self) -> Result<(), DirectoryError> {
        match self.conn.take() {
            Some(mut conn) => Ok(conn.unbind()?),
            None => Ok(()),
        }
    }
}

impl Drop for LdapHandle {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.unbind() {
                debug!(error = %e, "Unbind on drop failed");
            }
        }
    }
}

fn scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Turn a non-success result into an error
fn check(result: LdapResult) -> Result<LdapResult, DirectoryError> {
    if result.rc == 0 {
        Ok(result)
    } else {
        Err(DirectoryError::Rejected {
            rc: result.rc,
            message: result.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_without_url_fails_before_connecting() {
        let connector = LdapConnector::new(Arc::new(LdapStoreConfig::default()));
        let err = connector
            .bind(Some("cn=admin,dc=example,dc=com"), Some(&Secret::new("admin")))
            .err()
            .unwrap();

        assert!(matches!(
            err,
            DirectoryError::Configuration(idstore_core::Error::MissingUrl)
        ));
    }

    #[test]
    fn test_scope_mapping() {
        assert!(matches!(scope(SearchScope::OneLevel), Scope::OneLevel));
        assert!(matches!(scope(SearchScope::Subtree), Scope::Subtree));
    }

    #[test]
    fn test_check_result_codes() {
        let ok = LdapResult {
            rc: 0,
            matched: String::new(),
            text: String::new(),
            refs: vec![],
            ctrls: vec![],
        };
        assert!(check(ok).is_ok());

        let rejected = LdapResult {
            rc: 49,
            matched: String::new(),
            text: "invalid credentials".to_string(),
            refs: vec![],
            ctrls: vec![],
        };
        assert!(matches!(
            check(rejected),
            Err(DirectoryError::Rejected { rc: 49, .. })
        ));
    }
}
