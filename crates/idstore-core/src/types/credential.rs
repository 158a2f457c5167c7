//! Caller credentials

use super::Secret;

/// The shape of a credential presented to an identity store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialKind {
    /// Caller name and password
    UsernamePassword { caller: String, password: Secret },
    /// Caller name only; the authentication mechanism vouches for it
    CallerOnly { caller: String },
    /// Opaque remember-me token
    RememberMe { token: Secret },
}

/// A credential plus the validity flag its producer may clear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    kind: CredentialKind,
    valid: bool,
}

impl Credential {
    pub fn new(kind: CredentialKind) -> Self {
        Self { kind, valid: true }
    }

    pub fn username_password(caller: impl Into<String>, password: impl Into<Secret>) -> Self {
        Self::new(CredentialKind::UsernamePassword {
            caller: caller.into(),
            password: password.into(),
        })
    }

    pub fn caller_only(caller: impl Into<String>) -> Self {
        Self::new(CredentialKind::CallerOnly {
            caller: caller.into(),
        })
    }

    pub fn remember_me(token: impl Into<Secret>) -> Self {
        Self::new(CredentialKind::RememberMe {
            token: token.into(),
        })
    }

    pub fn kind(&self) -> &CredentialKind {
        &self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the credential as unusable, e.g. after the mechanism rejected it
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_kind_and_validity() {
        let credential = Credential::username_password("jdoe", "secret");
        assert!(matches!(
            credential.kind(),
            CredentialKind::UsernamePassword { caller, .. } if caller == "jdoe"
        ));
        assert!(credential.is_valid());

        let mut credential = Credential::caller_only("jdoe");
        credential.invalidate();
        assert!(!credential.is_valid());

        assert!(matches!(
            Credential::remember_me("token").kind(),
            CredentialKind::RememberMe { .. }
        ));
    }
}
