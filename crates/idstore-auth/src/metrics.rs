//! Store metrics
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use idstore_core::types::ValidationStatus;
use ::metrics::{counter, histogram};

/// Metric names
pub mod names {
    pub const VALIDATIONS_TOTAL: &str = "idstore_validations_total";
    pub const VALIDATION_ERRORS_TOTAL: &str = "idstore_validation_errors_total";
    pub const BINDS_TOTAL: &str = "idstore_directory_binds_total";
    pub const GROUPS_RESOLVED: &str = "idstore_groups_resolved";
}

/// Bind purpose label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindKind {
    Admin,
    Caller,
}

impl BindKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindKind::Admin => "admin",
            BindKind::Caller => "caller",
        }
    }
}

pub fn record_validation(status: ValidationStatus) {
    let outcome = match status {
        ValidationStatus::NotValidated => "not_validated",
        ValidationStatus::Invalid => "invalid",
        ValidationStatus::Valid => "valid",
    };
    counter!(names::VALIDATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_validation_error() {
    counter!(names::VALIDATION_ERRORS_TOTAL).increment(1);
}

pub fn record_bind(kind: BindKind, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(names::BINDS_TOTAL, "kind" => kind.as_str(), "result" => result).increment(1);
}

pub fn record_groups(strategy: &'static str, count: usize) {
    histogram!(names::GROUPS_RESOLVED, "strategy" => strategy).record(count as f64);
}
