//! groups command - list the groups of a caller

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct GroupsResult {
    caller: String,
    dn: Option<String>,
    groups: Vec<String>,
}

/// Returns whether the caller was found
pub fn execute(ctx: &CommandContext, caller: &str) -> Result<bool> {
    let store = ctx.store()?;

    let (found, dn, groups) = match store.groups_for(caller)? {
        Some((dn, groups)) => (true, Some(dn), groups),
        None => (false, None, Default::default()),
    };
    let mut groups: Vec<String> = groups.into_iter().collect();
    groups.sort();

    if ctx.is_json() {
        let result = GroupsResult {
            caller: caller.to_string(),
            dn,
            groups,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !found {
        println!("{}: {}", caller.blue().bold(), "not found".red());
    } else {
        println!("{}", caller.blue().bold());
        if let Some(dn) = &dn {
            println!("  {}: {}", "DN".cyan(), dn);
        }
        println!("  {}: {}", "Groups".cyan(), groups.len());
        for group in &groups {
            println!("    {}", group);
        }
    }

    Ok(found)
}
