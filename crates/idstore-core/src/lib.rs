//! Idstore Core Library
//!
//! Configuration, error and credential types shared by the Idstore
//! identity store crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{IdStoreConfig, LdapStoreConfig};
pub use error::{Error, Result};

/// Idstore version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attribute name that stands for the entry's own distinguished name
pub const DN_ATTRIBUTE: &str = "dn";

/// Default priority of an identity store
pub const DEFAULT_PRIORITY: i32 = 80;

/// Default size limit for directory searches
pub const DEFAULT_MAX_RESULTS: i32 = 1000;
