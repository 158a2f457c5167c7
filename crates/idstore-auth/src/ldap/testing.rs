//! In-memory directory for store tests

use crate::ldap::connector::{
    BindCredentials, DirectoryConnector, DirectoryEntry, DirectoryHandle, SearchDescriptor,
    SearchResults,
};
use crate::ldap::error::DirectoryError;
use idstore_core::types::Secret;
use idstore_core::LdapStoreConfig;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ADMIN_DN: &str = "cn=admin,dc=example,dc=com";
pub const ADMIN_PASSWORD: &str = "admin";

#[derive(Default)]
struct State {
    entries: HashMap<String, DirectoryEntry>,
    passwords: HashMap<String, String>,
    search_results: HashMap<String, Vec<String>>,
    failing_searches: HashSet<String>,
    failing_reads: HashSet<String>,
    searches: Vec<SearchDescriptor>,
    unavailable: bool,
}

#[derive(Default)]
pub struct Counters {
    pub binds: AtomicUsize,
    pub searches: AtomicUsize,
    pub reads: AtomicUsize,
    pub unbinds: AtomicUsize,
}

/// Directory connector backed by in-memory entries
#[derive(Clone)]
pub struct MemoryDirectory {
    config: Arc<LdapStoreConfig>,
    state: Arc<Mutex<State>>,
    pub counters: Arc<Counters>,
}

impl MemoryDirectory {
    /// A directory that accepts the admin bind from `config`
    pub fn new(config: &LdapStoreConfig) -> Self {
        let directory = Self {
            config: Arc::new(config.clone()),
            state: Arc::default(),
            counters: Arc::default(),
        };
        directory.add_password(ADMIN_DN, ADMIN_PASSWORD);
        directory
    }

    pub fn add_entry(&self, entry: DirectoryEntry) -> &Self {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(entry.dn.clone(), entry);
        self
    }

    pub fn add_password(&self, dn: &str, password: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .passwords
            .insert(dn.to_string(), password.to_string());
        self
    }

    /// Entries returned for searches using exactly `filter`
    pub fn on_search(&self, filter: &str, dns: &[&str]) -> &Self {
        self.state.lock().unwrap().search_results.insert(
            filter.to_string(),
            dns.iter().map(|dn| dn.to_string()).collect(),
        );
        self
    }

    pub fn fail_search(&self, filter: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_searches
            .insert(filter.to_string());
        self
    }

    pub fn fail_read(&self, dn: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failing_reads
            .insert(dn.to_string());
        self
    }

    pub fn set_unavailable(&self) {
        self.state.lock().unwrap().unavailable = true;
    }

    pub fn searches(&self) -> Vec<SearchDescriptor> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn binds(&self) -> usize {
        self.counters.binds.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> usize {
        self.counters.unbinds.load(Ordering::SeqCst)
    }

    /// Directory operations of any kind
    pub fn calls(&self) -> usize {
        self.binds()
            + self.counters.searches.load(Ordering::SeqCst)
            + self.counters.reads.load(Ordering::SeqCst)
    }
}

impl DirectoryConnector for MemoryDirectory {
    type Handle = MemoryHandle;

    fn bind(
        &self,
        identity: Option<&str>,
        secret: Option<&Secret>,
    ) -> Result<MemoryHandle, DirectoryError> {
        let credentials = BindCredentials::prepare(&self.config, identity, secret)?;
        self.counters.binds.fetch_add(1, Ordering::SeqCst);

        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(DirectoryError::Rejected {
                rc: 52,
                message: "unavailable".into(),
            });
        }

        if let BindCredentials::Simple { dn, password } = &credentials {
            if state.passwords.get(dn) != Some(password) {
                return Err(DirectoryError::Rejected {
                    rc: DirectoryError::INVALID_CREDENTIALS,
                    message: "invalid credentials".into(),
                });
            }
        }

        Ok(MemoryHandle {
            state: self.state.clone(),
            counters: self.counters.clone(),
            open: true,
        })
    }
}

pub struct MemoryHandle {
    state: Arc<Mutex<State>>,
    counters: Arc<Counters>,
    open: bool,
}

impl DirectoryHandle for MemoryHandle {
    fn search(&mut self, search: &SearchDescriptor) -> Result<SearchResults, DirectoryError> {
        self.counters.searches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.searches.push(search.clone());

        if state.failing_searches.contains(&search.filter) {
            return Err(DirectoryError::Rejected {
                rc: 1,
                message: "operations error".into(),
            });
        }

        let mut dns = state
            .search_results
            .get(&search.filter)
            .cloned()
            .unwrap_or_default();

        let truncated = search.size_limit > 0 && dns.len() > search.size_limit as usize;
        if truncated {
            dns.truncate(search.size_limit as usize);
        }

        Ok(SearchResults {
            entries: dns
                .iter()
                .map(|dn| {
                    state
                        .entries
                        .get(dn)
                        .cloned()
                        .unwrap_or_else(|| DirectoryEntry::new(dn.as_str()))
                })
                .collect(),
            truncated,
        })
    }

    fn read_attributes(
        &mut self,
        dn: &str,
        attributes: &[&str],
    ) -> Result<DirectoryEntry, DirectoryError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();

        if state.failing_reads.contains(dn) {
            return Err(DirectoryError::Rejected {
                rc: 1,
                message: "operations error".into(),
            });
        }

        let entry = state.entries.get(dn).ok_or(DirectoryError::Rejected {
            rc: DirectoryError::NO_SUCH_OBJECT,
            message: "no such object".into(),
        })?;

        let mut read = DirectoryEntry::new(entry.dn.as_str());
        for attribute in attributes {
            if let Some(values) = entry.get(attribute) {
                read.attributes.insert(attribute.to_string(), values.to_vec());
            }
        }
        Ok(read)
    }

    fn unbind(mut self) -> Result<(), DirectoryError> {
        self.open = false;
        self.counters.unbinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        if self.open {
            self.counters.unbinds.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Store configuration pointing at the in-memory directory
pub fn test_config() -> LdapStoreConfig {
    LdapStoreConfig {
        url: "ldap://ldap.example.com:389/".to_string(),
        bind_dn: ADMIN_DN.to_string(),
        bind_password: Secret::new(ADMIN_PASSWORD),
        caller_base_dn: "ou=people,dc=example,dc=com".to_string(),
        caller_search_base: "ou=people,dc=example,dc=com".to_string(),
        caller_search_filter: "(objectClass=person)".to_string(),
        ..Default::default()
    }
}
