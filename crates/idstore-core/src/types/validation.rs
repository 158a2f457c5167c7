//! Validation results

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What an identity store is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    /// Validate credentials
    Validate,
    /// Provide the caller's groups
    ProvideGroups,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    NotValidated,
    Invalid,
    Valid,
}

/// Outcome of one validation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    status: ValidationStatus,
    store_id: Option<String>,
    caller_name: Option<String>,
    caller_dn: Option<String>,
    caller_unique_id: Option<String>,
    groups: HashSet<String>,
}

impl ValidationResult {
    pub fn not_validated() -> Self {
        Self::empty(ValidationStatus::NotValidated)
    }

    pub fn invalid() -> Self {
        Self::empty(ValidationStatus::Invalid)
    }

    pub fn valid(
        store_id: impl Into<String>,
        caller_name: impl Into<String>,
        caller_dn: impl Into<String>,
        caller_unique_id: impl Into<String>,
        groups: HashSet<String>,
    ) -> Self {
        Self {
            status: ValidationStatus::Valid,
            store_id: Some(store_id.into()),
            caller_name: Some(caller_name.into()),
            caller_dn: Some(caller_dn.into()),
            caller_unique_id: Some(caller_unique_id.into()),
            groups,
        }
    }

    fn empty(status: ValidationStatus) -> Self {
        Self {
            status,
            store_id: None,
            caller_name: None,
            caller_dn: None,
            caller_unique_id: None,
            groups: HashSet::new(),
        }
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    pub fn store_id(&self) -> Option<&str> {
        self.store_id.as_deref()
    }

    pub fn caller_name(&self) -> Option<&str> {
        self.caller_name.as_deref()
    }

    pub fn caller_dn(&self) -> Option<&str> {
        self.caller_dn.as_deref()
    }

    pub fn caller_unique_id(&self) -> Option<&str> {
        self.caller_unique_id.as_deref()
    }

    pub fn groups(&self) -> &HashSet<String> {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_result_accessors() {
        let groups: HashSet<String> = ["admins".to_string()].into_iter().collect();
        let result = ValidationResult::valid(
            "ldap.example.com:389",
            "John Doe",
            "uid=jdoe,ou=people,dc=example,dc=com",
            "uid=jdoe,ou=people,dc=example,dc=com",
            groups,
        );

        assert!(result.is_valid());
        assert_eq!(result.caller_name(), Some("John Doe"));
        assert!(result.groups().contains("admins"));
    }

    #[test]
    fn test_invalid_result_is_empty() {
        let result = ValidationResult::invalid();
        assert_eq!(result.status(), ValidationStatus::Invalid);
        assert!(result.caller_dn().is_none());
        assert!(result.groups().is_empty());
    }
}
