//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lobup - upload encrypted Win32 app packages
#[derive(Parser)]
#[command(name = "lobup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Upload encrypted Win32 application packages to a device-management service")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create an application and upload a package archive as its content
    Upload {
        /// Package archive (.intunewin)
        archive: PathBuf,

        /// Application descriptor (TOML or JSON)
        #[arg(long, value_name = "FILE")]
        app: PathBuf,

        /// Bearer token for the registry API
        #[arg(long, env = "LOBUP_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Override the registry base URL
        #[arg(long, value_name = "URL")]
        registry_url: Option<String>,

        /// Override the chunk size in bytes
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Show the manifest of a package archive without uploading it
    Inspect {
        /// Package archive (.intunewin)
        archive: PathBuf,
    },
}
