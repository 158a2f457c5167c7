//! LDAP identity store
//!
//! Validates credentials against an LDAP directory:
//! - caller DN resolution (DN passthrough, DN synthesis or search)
//! - password verification by binding as the caller
//! - group resolution by group search or memberOf-style attribute
//! - LDAPS and STARTTLS transport

mod caller;
mod client;
mod connector;
mod dn;
mod error;
mod filter;
mod groups;
mod store;

#[cfg(test)]
mod testing;

pub use caller::CallerResolver;
pub use client::{LdapConnector, LdapHandle};
pub use connector::{
    BindCredentials, DirectoryConnector, DirectoryEntry, DirectoryHandle, SearchDescriptor,
    SearchResults,
};
pub use dn::is_valid_dn;
pub use error::{DirectoryError, StoreError};
pub use filter::{build_filter, SUBSTITUTION_TOKEN};
pub use groups::{GroupResolver, GroupStrategy};
pub use store::LdapIdentityStore;
