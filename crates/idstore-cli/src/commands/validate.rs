//! validate command - validate a caller credential

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use idstore_core::types::{Credential, ValidationResult, ValidationStatus};

/// Returns whether the credential is valid
pub fn execute(ctx: &CommandContext, caller: &str, password: Option<String>) -> Result<bool> {
    let store = ctx.store()?;
    let credential = match password {
        Some(password) => Credential::username_password(caller, password),
        None => Credential::caller_only(caller),
    };

    let result = store.validate(&credential)?;

    if ctx.is_json() {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(caller, &result);
    }

    Ok(result.is_valid())
}

fn print_result(caller: &str, result: &ValidationResult) {
    let status = match result.status() {
        ValidationStatus::Valid => "VALID".green().bold(),
        ValidationStatus::Invalid => "INVALID".red().bold(),
        ValidationStatus::NotValidated => "NOT VALIDATED".yellow().bold(),
    };
    println!("{}: {}", caller.blue().bold(), status);

    if !result.is_valid() {
        return;
    }

    println!();
    if let Some(realm) = result.store_id() {
        println!("  {}: {}", "Realm".cyan(), realm);
    }
    if let Some(name) = result.caller_name() {
        println!("  {}: {}", "Caller".cyan(), name);
    }
    if let Some(dn) = result.caller_dn() {
        println!("  {}: {}", "DN".cyan(), dn);
    }

    let mut groups: Vec<&String> = result.groups().iter().collect();
    groups.sort();
    println!("  {}: {}", "Groups".cyan(), groups.len());
    for group in groups {
        println!("    {}", group);
    }
}
