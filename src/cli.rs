//! Command Line Interface (CLI) arguments.

use crate::error::VizzError;

use clap::{Parser, ValueEnum};
use expanduser::expanduser;
use std::path::PathBuf;
use std::time::Duration;
use strum_macros::Display;

/// Document store backends
#[derive(Clone, Copy, Debug, Display, PartialEq, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum StoreKind {
    /// Embedded sled database, one tree per partition
    Sled,
    /// Directory of `<partition>.json` files
    JsonDir,
}

/// Vizz command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "VIZZ_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 5090, env = "VIZZ_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "VIZZ_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/vizz/certs/cert.pem",
        env = "VIZZ_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/vizz/certs/key.pem",
        env = "VIZZ_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "VIZZ_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Maximum time in seconds to spend on a single request.
    #[arg(long, default_value_t = 30, env = "VIZZ_REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Document store backend
    #[arg(long, value_enum, default_value_t = StoreKind::Sled, env = "VIZZ_STORE")]
    pub store: StoreKind,
    /// Path to the document store: the sled database directory, or the directory of JSON files
    #[arg(long, default_value = "~/.local/share/vizz/store", env = "VIZZ_STORE_PATH")]
    pub store_path: String,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "VIZZ_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
}

impl CommandLineArgs {
    /// Returns the per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Returns the store path with `~` expanded.
    pub fn store_path(&self) -> Result<PathBuf, VizzError> {
        Ok(expanduser(&self.store_path)?)
    }
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
