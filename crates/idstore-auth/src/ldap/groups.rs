//! Group membership resolution
//!
//! Directories record membership either on the group entry (a member list,
//! found with a reverse search) or on the caller entry (a memberOf-style
//! back reference). Which one applies is decided by the group search
//! configuration.

use crate::ldap::connector::{DirectoryEntry, DirectoryHandle, SearchDescriptor};
use crate::ldap::error::StoreError;
use crate::ldap::filter::build_filter;
use crate::metrics::record_groups;
use idstore_core::{LdapStoreConfig, DN_ATTRIBUTE};
use std::collections::HashSet;
use tracing::{debug, error, warn};

/// How group membership is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStrategy {
    /// Search group entries whose member attribute holds the caller DN
    ReverseSearch { base: String, filter: String },
    /// Read the memberOf attribute of the caller entry
    MembershipAttribute,
}

impl GroupStrategy {
    pub fn for_config(config: &LdapStoreConfig) -> Self {
        if !config.group_search_base.is_empty() && !config.group_search_filter.is_empty() {
            GroupStrategy::ReverseSearch {
                base: config.group_search_base.clone(),
                filter: config.group_search_filter.clone(),
            }
        } else {
            GroupStrategy::MembershipAttribute
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStrategy::ReverseSearch { .. } => "reverse_search",
            GroupStrategy::MembershipAttribute => "membership_attribute",
        }
    }
}

pub struct GroupResolver<'a> {
    config: &'a LdapStoreConfig,
    strategy: GroupStrategy,
}

impl<'a> GroupResolver<'a> {
    pub fn new(config: &'a LdapStoreConfig) -> Self {
        Self {
            config,
            strategy: GroupStrategy::for_config(config),
        }
    }

    /// Group identities of the caller, over an already bound handle
    pub fn resolve_groups<H: DirectoryHandle>(
        &self,
        handle: &mut H,
        caller_dn: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let groups = match &self.strategy {
            GroupStrategy::ReverseSearch { base, filter } => {
                self.reverse_search(handle, caller_dn, base, filter)?
            }
            GroupStrategy::MembershipAttribute => self.membership_attribute(handle, caller_dn),
        };

        record_groups(self.strategy.as_str(), groups.len());
        debug!(
            dn = caller_dn,
            strategy = self.strategy.as_str(),
            count = groups.len(),
            "Resolved caller groups"
        );
        Ok(groups)
    }

    fn names_by_dn(&self) -> bool {
        self.config.group_name_attribute.eq_ignore_ascii_case(DN_ATTRIBUTE)
    }

    fn reverse_search<H: DirectoryHandle>(
        &self,
        handle: &mut H,
        caller_dn: &str,
        base: &str,
        template: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let config = self.config;
        let filter = build_filter(template, caller_dn, &config.group_member_attribute);
        let search = SearchDescriptor::new(
            base,
            filter.as_str(),
            config.group_search_scope,
            config,
            vec![config.group_name_attribute.clone()],
        );
        debug!(base = %search.base, filter = %search.filter, controls = %search, "LDAP group search");

        let results = handle.search(&search).map_err(|source| {
            error!(dn = caller_dn, filter = %filter, base, error = %source, "Group search failed");
            StoreError::GroupSearch {
                caller_dn: caller_dn.to_string(),
                source,
            }
        })?;

        Ok(results
            .entries
            .iter()
            .filter_map(|entry| self.group_name(entry))
            .collect())
    }

    fn membership_attribute<H: DirectoryHandle>(
        &self,
        handle: &mut H,
        caller_dn: &str,
    ) -> HashSet<String> {
        let member_of = self.config.group_member_of_attribute.as_str();
        let entry = match handle.read_attributes(caller_dn, &[member_of]) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dn = caller_dn, attribute = member_of, error = %e, "Could not read group membership of caller");
                return HashSet::new();
            }
        };

        let group_dns = entry.get(member_of).unwrap_or_default();
        if self.names_by_dn() {
            return group_dns.iter().cloned().collect();
        }

        let name_attribute = self.config.group_name_attribute.as_str();
        group_dns
            .iter()
            .filter_map(|group_dn| match handle.read_attributes(group_dn, &[name_attribute]) {
                Ok(group) => self.group_name(&group),
                Err(e) => {
                    warn!(dn = %group_dn, attribute = name_attribute, error = %e, "Could not read group entry, skipping");
                    None
                }
            })
            .collect()
    }

    /// The identity of one group entry, `None` if the name attribute is absent
    fn group_name(&self, entry: &DirectoryEntry) -> Option<String> {
        if self.names_by_dn() {
            return Some(entry.dn.clone());
        }

        let attribute = self.config.group_name_attribute.as_str();
        let name = entry.first(attribute).map(str::to_string);
        if name.is_none() {
            warn!(dn = %entry.dn, attribute, "Group entry has no name attribute, skipping");
        }
        name
    }
}
