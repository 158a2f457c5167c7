//! Authentication for Idstore
//!
//! The LDAP identity store validates caller credentials against a directory
//! server and resolves the caller's groups.

pub mod ldap;
pub mod metrics;

pub use ldap::{
    build_filter, is_valid_dn, CallerResolver, DirectoryConnector, DirectoryEntry,
    DirectoryError, DirectoryHandle, GroupResolver, GroupStrategy, LdapConnector, LdapHandle,
    LdapIdentityStore, SearchDescriptor, SearchResults, StoreError,
};
