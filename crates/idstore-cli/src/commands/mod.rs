//! CLI command implementations

pub mod encode;
pub mod groups;
pub mod validate;

use crate::OutputFormat;
use anyhow::Result;
use idstore_auth::LdapIdentityStore;
use idstore_core::config::IdStoreConfig;

/// Context passed to all commands
pub struct CommandContext {
    pub config: IdStoreConfig,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Store over the configured directory
    pub fn store(&self) -> Result<LdapIdentityStore> {
        Ok(LdapIdentityStore::new(self.config.ldap.clone())?)
    }
}
