//! Server configuration and CLI argument parsing
//!
//! This module handles all server configuration through a flexible system that supports:
//! - Command-line arguments
//! - Environment variables (with QUOTAGATE_ prefix)
//! - A plans file describing the tiers (see [`crate::plans`])
//!
//! # Configuration Priority
//!
//! The configuration system follows this precedence order:
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! quotagate --http-port 9090 --cooldown-seconds 10
//!
//! # Using environment variables
//! export QUOTAGATE_STORE=file
//! export QUOTAGATE_STORE_PATH=/var/lib/quotagate/counters.json
//! quotagate
//!
//! # Mixed (CLI overrides env)
//! export QUOTAGATE_HTTP_PORT=8080
//! quotagate --http-port 9090  # Uses port 9090
//! ```

use anyhow::{Result, anyhow};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the server
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP transport configuration
    pub http: HttpConfig,
    /// Counter store configuration
    pub store: StoreConfig,
    /// Quota and cooldown settings
    pub limits: LimitsConfig,
    /// Generation service settings
    pub generator: GeneratorConfig,
    /// Channel buffer size for actor communication
    pub buffer_size: usize,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Honor `tier` and `timestamp` sent by callers
    ///
    /// Only for deployments where every caller is a trusted backend. Off,
    /// the tier is derived from the identity and the server clock is used.
    pub trust_client_context: bool,
}

/// Counter store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Type of store to use
    pub store_type: StoreType,
    /// Initial capacity (expected number of identities)
    pub capacity: usize,
    /// JSON file backing the file store
    pub path: Option<PathBuf>,
}

/// Available counter stores
///
/// - **Memory**: Counters live in process memory and are lost on restart
/// - **File**: Counters are written through to a JSON file
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Memory,
    File,
}

impl std::str::FromStr for StoreType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            "file" => Ok(StoreType::File),
            _ => Err(anyhow!(
                "Invalid store type: {}. Valid options are: memory, file",
                s
            )),
        }
    }
}

/// Quota and cooldown settings
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Plans file; the built-in tiers are used when absent
    pub plans_file: Option<PathBuf>,
    /// Minimum seconds between two generations by the same identity
    pub cooldown_seconds: u64,
}

/// Generation service settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Upper bound on a single generation call
    pub timeout: Duration,
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// QUOTAGATE_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "quotagate",
    about = "Entitlement and quota service for AI lesson generation",
    long_about = "An HTTP service that decides whether a user or guest may run another AI generation or open another catalog item, under daily, weekly, monthly and lifetime limits.\n\nEnvironment variables with QUOTAGATE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // HTTP Transport
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "QUOTAGATE_HTTP_HOST"
    )]
    pub http_host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "QUOTAGATE_HTTP_PORT"
    )]
    pub http_port: u16,
    #[arg(
        long,
        help = "Honor tier and timestamp sent by callers (trusted backends only)",
        env = "QUOTAGATE_TRUST_CLIENT_CONTEXT",
        action = clap::ArgAction::SetTrue
    )]
    pub trust_client_context: bool,

    // Store Configuration
    #[arg(
        long,
        value_name = "TYPE",
        help = "Store type: memory, file",
        default_value = "memory",
        env = "QUOTAGATE_STORE"
    )]
    pub store: StoreType,
    #[arg(
        long,
        value_name = "SIZE",
        help = "Initial store capacity",
        default_value_t = 100_000,
        env = "QUOTAGATE_STORE_CAPACITY"
    )]
    pub store_capacity: usize,
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON file for the file store",
        env = "QUOTAGATE_STORE_PATH"
    )]
    pub store_path: Option<PathBuf>,

    // Limits
    #[arg(
        long,
        value_name = "PATH",
        help = "Plans file (toml, json or yaml)",
        env = "QUOTAGATE_PLANS_FILE"
    )]
    pub plans_file: Option<PathBuf>,
    #[arg(
        long,
        value_name = "SECS",
        help = "Minimum seconds between generations per identity",
        default_value_t = 30,
        env = "QUOTAGATE_COOLDOWN_SECONDS"
    )]
    pub cooldown_seconds: u64,

    // Generator
    #[arg(
        long,
        value_name = "MILLIS",
        help = "Generation timeout in milliseconds",
        default_value_t = 30_000,
        env = "QUOTAGATE_GENERATOR_TIMEOUT_MS"
    )]
    pub generator_timeout_ms: u64,

    // General options
    #[arg(
        long,
        value_name = "SIZE",
        help = "Channel buffer size",
        default_value_t = 10_000,
        env = "QUOTAGATE_BUFFER_SIZE"
    )]
    pub buffer_size: usize,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "QUOTAGATE_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        let config = Self::from_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Build configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Self {
        Config {
            http: HttpConfig {
                host: args.http_host,
                port: args.http_port,
                trust_client_context: args.trust_client_context,
            },
            store: StoreConfig {
                store_type: args.store,
                capacity: args.store_capacity,
                path: args.store_path,
            },
            limits: LimitsConfig {
                plans_file: args.plans_file,
                cooldown_seconds: args.cooldown_seconds,
            },
            generator: GeneratorConfig {
                timeout: Duration::from_millis(args.generator_timeout_ms),
            },
            buffer_size: args.buffer_size,
            log_level: args.log_level,
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the file store has no path, the buffer size is
    /// zero, or the generator timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.store.store_type == StoreType::File && self.store.path.is_none() {
            return Err(anyhow!(
                "The file store needs a path.\n\n\
                Example:\n  \
                quotagate --store file --store-path ./counters.json\n\n\
                For more information, try '--help'"
            ));
        }

        if self.buffer_size == 0 {
            return Err(anyhow!("Buffer size must be greater than zero"));
        }

        if self.generator.timeout.is_zero() {
            return Err(anyhow!("Generator timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("quotagate Environment Variables");
        println!("===============================");
        println!();
        println!("All environment variables use the QUOTAGATE_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Transport Configuration:");
        println!("  QUOTAGATE_HTTP_HOST=<host>            HTTP host [default: 127.0.0.1]");
        println!("  QUOTAGATE_HTTP_PORT=<port>            HTTP port [default: 8080]");
        println!(
            "  QUOTAGATE_TRUST_CLIENT_CONTEXT=<bool> Honor caller tier and timestamp [default: false]"
        );
        println!();

        println!("Store Configuration:");
        println!("  QUOTAGATE_STORE=<type>                Store type: memory, file [default: memory]");
        println!("  QUOTAGATE_STORE_CAPACITY=<size>       Initial store capacity [default: 100000]");
        println!("  QUOTAGATE_STORE_PATH=<path>           JSON file for the file store");
        println!();

        println!("Limits:");
        println!("  QUOTAGATE_PLANS_FILE=<path>           Plans file (toml, json, yaml) [default: built-in tiers]");
        println!("  QUOTAGATE_COOLDOWN_SECONDS=<secs>     Seconds between generations [default: 30]");
        println!();

        println!("Generator:");
        println!("  QUOTAGATE_GENERATOR_TIMEOUT_MS=<ms>   Generation timeout [default: 30000]");
        println!();

        println!("General Configuration:");
        println!("  QUOTAGATE_BUFFER_SIZE=<size>          Channel buffer size [default: 10000]");
        println!(
            "  QUOTAGATE_LOG_LEVEL=<level>           Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Persist counters to a file");
        println!("  export QUOTAGATE_STORE=file");
        println!("  export QUOTAGATE_STORE_PATH=./counters.json");
        println!();
        println!("  # Run server (CLI args override env vars)");
        println!("  quotagate --http-port 9090");
    }
}
