use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use crate::error::Result;

/// Maskfleet CLI - fingerprint synthesis and browser session orchestration
#[derive(Parser)]
#[command(name = "maskfleet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Browser executable path (overrides auto-discovery)
    #[arg(long, env = "MASKFLEET_BROWSER", global = true)]
    pub browser_path: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fingerprint generation and analysis
    Fingerprint {
        #[command(subcommand)]
        command: FingerprintCommands,
    },

    /// Browser session lifecycle
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// List detected browser installations
    Browsers,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum FingerprintCommands {
    /// Generate a new fingerprint
    Generate {
        /// Platform: windows, macos, linux, ios
        #[arg(short, long)]
        platform: Option<String>,

        /// Seed for deterministic output
        #[arg(long)]
        seed: Option<u64>,

        /// JSON file with field overrides
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Check a fingerprint for internal consistency
    Validate {
        /// Fingerprint JSON file
        file: PathBuf,
    },

    /// Pairwise similarity between two fingerprints (0.0 - 1.0)
    Similarity {
        /// First fingerprint JSON file
        a: PathBuf,
        /// Second fingerprint JSON file
        b: PathBuf,
    },

    /// Uniqueness of a fingerprint against a population (0 - 100)
    Uniqueness {
        /// Fingerprint JSON file
        file: PathBuf,
        /// Population fingerprint JSON files
        population: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Launch a browser session for a profile
    Launch {
        /// Profile ID (one session per profile)
        #[arg(short, long)]
        profile: String,

        /// Fingerprint JSON file for this session
        #[arg(short, long)]
        fingerprint: PathBuf,

        /// Proxy server (host:port, optionally scheme-prefixed)
        #[arg(long)]
        proxy: Option<String>,

        /// Proxy username
        #[arg(long)]
        proxy_user: Option<String>,

        /// Name of the environment variable holding the proxy password
        #[arg(long)]
        proxy_pass_env: Option<String>,

        /// Run headless
        #[arg(long)]
        headless: bool,

        /// Browser state directory (defaults to the configured profiles dir)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Unpacked extension to load (repeatable)
        #[arg(long = "extension")]
        extensions: Vec<PathBuf>,

        /// Extra browser argument, appended last (repeatable)
        #[arg(long = "arg")]
        args: Vec<String>,

        /// Stay attached and close the session on Ctrl-C
        #[arg(long)]
        attach: bool,
    },

    /// Close one session
    Close {
        /// Profile ID
        #[arg(short, long)]
        profile: String,
    },

    /// Close every recorded session
    CloseAll,

    /// List recorded sessions
    List,

    /// Re-check one session's state
    Status {
        /// Profile ID
        #[arg(short, long)]
        profile: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Remove the configuration file
    Reset,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Fingerprint { command } => commands::fingerprint::run(self, command).await,
            Commands::Session { command } => commands::session::run(self, command).await,
            Commands::Browsers => commands::browsers::run(self).await,
            Commands::Config { command } => commands::config::run(self, command).await,
        }
    }
}
