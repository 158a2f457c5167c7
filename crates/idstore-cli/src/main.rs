//! Idstore - LDAP caller identity store
//!
//! Validates caller credentials and looks up caller groups against an LDAP
//! directory, and encodes bind passwords for the configuration file.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use idstore_core::config::IdStoreConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "idstore")]
#[command(author = "Idstore Team")]
#[command(version = idstore_core::VERSION)]
#[command(about = "LDAP caller identity store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "IDSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// LDAP server URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Administrative bind DN
    #[arg(long, global = true)]
    bind_dn: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Print store metrics in Prometheus format after the command
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a caller, with a password or as a caller-only credential
    Validate {
        /// Caller name or DN
        caller: String,

        /// Caller password
        #[arg(short, long, env = "IDSTORE_CALLER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the groups of a caller
    Groups {
        /// Caller name or DN
        caller: String,
    },

    /// Encode a password for the configuration file
    Encode {
        password: String,

        /// Encoding scheme
        #[arg(short, long, default_value = "xor")]
        scheme: String,

        /// Passphrase for the aes scheme
        #[arg(long, env = "IDSTORE_PASSWORD_KEY", hide_env_values = true)]
        key: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_path = cli.config;
    let mut config = IdStoreConfig::load(config_path.as_deref())?;
    if let Some(url) = cli.url {
        config.ldap.url = url;
    }
    if let Some(bind_dn) = cli.bind_dn {
        config.ldap.bind_dn = bind_dn;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config);
    debug!(
        path = ?config_path,
        url = %config.ldap.url,
        caller_search_base = %config.ldap.caller_search_base,
        group_search_base = %config.ldap.group_search_base,
        "Configuration loaded"
    );
    let recorder = cli.metrics.then(install_recorder).transpose()?;

    let ctx = CommandContext {
        config,
        output_format: cli.output,
    };

    let success = match cli.command {
        Commands::Validate { caller, password } => {
            commands::validate::execute(&ctx, &caller, password)?
        }
        Commands::Groups { caller } => commands::groups::execute(&ctx, &caller)?,
        Commands::Encode {
            password,
            scheme,
            key,
        } => commands::encode::execute(&ctx, &password, &scheme, key)?,
    };

    if let Some(handle) = recorder {
        print!("{}", handle.render());
    }

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(config: &IdStoreConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "idstore",
            "--url",
            "ldap://localhost:389",
            "validate",
            "jdoe",
            "--password",
            "secret",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("ldap://localhost:389"));
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Validate { caller, password } => {
                assert_eq!(caller, "jdoe");
                assert_eq!(password.as_deref(), Some("secret"));
            }
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_parse_encode_defaults_to_xor() {
        let cli = Cli::try_parse_from(["idstore", "encode", "admin"]).unwrap();
        match cli.command {
            Commands::Encode { password, scheme, .. } => {
                assert_eq!(password, "admin");
                assert_eq!(scheme, "xor");
            }
            _ => panic!("expected encode"),
        }
    }
}
