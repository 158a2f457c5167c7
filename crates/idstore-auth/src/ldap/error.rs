//! LDAP store errors

use idstore_crypto::PasswordError;
use thiserror::Error;

/// Failure of a single directory operation
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Configuration(#[from] idstore_core::Error),

    #[error("Bind password could not be decoded: {0}")]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Ldap(#[from] ldap3::LdapError),

    /// The server answered with a non-success result code
    #[error("LDAP operation failed with code {rc}: {message}")]
    Rejected { rc: u32, message: String },

    #[error("No such entry: {0}")]
    NoSuchEntry(String),

    #[error("Directory connection is already closed")]
    Closed,
}

impl DirectoryError {
    /// Result code 49, invalidCredentials
    pub const INVALID_CREDENTIALS: u32 = 49;

    /// Result code 32, noSuchObject
    pub const NO_SUCH_OBJECT: u32 = 32;

    /// Result code 4, sizeLimitExceeded
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;

    pub fn is_configuration(&self) -> bool {
        matches!(self, DirectoryError::Configuration(_) | DirectoryError::Password(_))
    }

    /// Whether the error is about the presented secret rather than the store
    pub fn rejects_secret(&self) -> bool {
        match self {
            DirectoryError::Configuration(idstore_core::Error::EmptyPassword)
            | DirectoryError::Password(_) => true,
            DirectoryError::Rejected { rc, .. } => *rc == Self::INVALID_CREDENTIALS,
            _ => false,
        }
    }
}

/// Failure of a store operation, surfaced to the caller of the store
///
/// Bad caller credentials never end up here; they produce an invalid
/// validation result instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Identity store configuration error: {0}")]
    Configuration(#[source] DirectoryError),

    #[error("Failed to bind as {dn:?}: {source}")]
    Bind {
        dn: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Caller search for {caller} with filter {filter} under {base} failed: {source}")]
    CallerSearch {
        caller: String,
        filter: String,
        base: String,
        #[source]
        source: DirectoryError,
    },

    #[error("Group search for {caller_dn} failed: {source}")]
    GroupSearch {
        caller_dn: String,
        #[source]
        source: DirectoryError,
    },
}

impl StoreError {
    /// Map a failed administrative bind
    pub(crate) fn admin_bind(dn: &str, source: DirectoryError) -> Self {
        if source.is_configuration() {
            StoreError::Configuration(source)
        } else {
            StoreError::Bind {
                dn: dn.to_string(),
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_rejection_classification() {
        let empty = DirectoryError::Configuration(idstore_core::Error::EmptyPassword);
        assert!(empty.is_configuration());
        assert!(empty.rejects_secret());

        let missing_url = DirectoryError::Configuration(idstore_core::Error::MissingUrl);
        assert!(missing_url.is_configuration());
        assert!(!missing_url.rejects_secret());

        let wrong = DirectoryError::Rejected {
            rc: DirectoryError::INVALID_CREDENTIALS,
            message: "invalid credentials".into(),
        };
        assert!(wrong.rejects_secret());
        assert!(!wrong.is_configuration());
    }

    #[test]
    fn test_admin_bind_mapping() {
        let err = StoreError::admin_bind(
            "cn=admin,dc=example,dc=com",
            DirectoryError::Configuration(idstore_core::Error::MissingUrl),
        );
        assert!(matches!(err, StoreError::Configuration(_)));

        let err = StoreError::admin_bind(
            "cn=admin,dc=example,dc=com",
            DirectoryError::Rejected {
                rc: 52,
                message: "unavailable".into(),
            },
        );
        assert!(matches!(err, StoreError::Bind { .. }));
    }
}
