//! encode command - encode a password for the configuration file

use super::CommandContext;
use anyhow::{Context, Result};
use idstore_crypto::{encode_password, PasswordScheme};

pub fn execute(
    ctx: &CommandContext,
    password: &str,
    scheme: &str,
    key: Option<String>,
) -> Result<bool> {
    let scheme = PasswordScheme::from_name(scheme)
        .with_context(|| format!("Unknown password scheme: {}. Use xor or aes.", scheme))?;

    let key = key.or_else(|| ctx.config.ldap.password_key.as_ref().map(|k| k.expose().to_string()));

    let encoded = encode_password(password, scheme, key.as_deref())?;

    if ctx.is_json() {
        println!("{}", serde_json::json!({ "encoded": encoded }));
    } else {
        println!("{}", encoded);
    }

    Ok(true)
}
