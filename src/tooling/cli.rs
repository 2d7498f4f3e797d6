//! CLI Tooling
//!
//! Command-line interface for browsing a remote drive. `browse` (the default)
//! opens the interactive shell; `ls` and `get` walk a path once and exit.

use crate::config::sources::environment::ACCESS_TOKEN_VAR;
use crate::config::{ConfigLoader, DriveConfig};
use crate::download::Downloader;
use crate::error::DriveError;
use crate::model::Entry;
use crate::remote::{GraphClient, RemoteListing, StaticToken, TokenServer, TokenSource};
use crate::session::DriveSession;
use crate::tooling::format::format_notice;
use crate::tooling::shell::Shell;
use crate::tree::{ChannelListener, NavigationCache};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// drivenav - browse a remote drive from the terminal
#[derive(Parser)]
#[command(name = "drivenav")]
#[command(about = "Browse a remote drive with a cached folder navigator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path, layered over the global config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Open the interactive shell at the root folder
    Browse,
    /// List a folder, given as a slash-separated path below the root
    Ls {
        #[arg(default_value = "")]
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Download a file, given as a slash-separated path below the root
    Get {
        path: String,
        /// Directory to save into (defaults to download.directory)
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Configuration commands (init, show)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Target file (defaults to the global config path)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration with secrets masked
    Show,
}

/// CLI context for command execution
pub struct CliContext {
    config: DriveConfig,
    runtime: Runtime,
}

impl CliContext {
    /// Load configuration and start the runtime that listing fetches run on
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, DriveError> {
        Self::with_config(ConfigLoader::load(config_path.as_deref())?)
    }

    /// Start the runtime around an already-loaded configuration
    pub fn with_config(config: DriveConfig) -> Result<Self, DriveError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("drivenav-worker")
            .build()?;
        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, DriveError> {
        match command {
            Commands::Browse => {
                let mut shell = self.open_shell(true, None)?;
                shell.run()?;
                Ok(String::new())
            }
            Commands::Ls { path, format } => self.handle_ls(path, format),
            Commands::Get { path, dest } => self.handle_get(path, dest.clone()),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_ls(&self, path: &str, format: &str) -> Result<String, DriveError> {
        if format != "text" && format != "json" {
            return Err(DriveError::InvalidOperation(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                format
            )));
        }
        let mut shell = self.open_shell(false, None)?;
        let listing = shell.open_path(path)?;
        if format == "json" {
            return serde_json::to_string_pretty(shell.listing()).map_err(|e| {
                DriveError::InvalidOperation(format!("Failed to serialize listing: {}", e))
            });
        }
        Ok(listing)
    }

    fn handle_get(&self, path: &str, dest: Option<PathBuf>) -> Result<String, DriveError> {
        let (folder, name) = split_file_path(path)?;
        let mut shell = self.open_shell(false, dest)?;
        shell.open_path(folder)?;
        let saved = shell.download(name)?;
        Ok(format_notice(&format!(
            "Downloaded {} to {}",
            name,
            saved.display()
        )))
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<String, DriveError> {
        match command {
            ConfigCommands::Init { path, force } => {
                let target = match path {
                    Some(path) => path.clone(),
                    None => ConfigLoader::global_config_path()?,
                };
                let written = ConfigLoader::write_default(&target, *force)?;
                Ok(format!("Wrote default configuration to {}", written.display()))
            }
            ConfigCommands::Show => self.config.redacted().to_toml(),
        }
    }

    /// Wire client, cache, listener and downloader into a shell
    fn open_shell(&self, interactive: bool, dest: Option<PathBuf>) -> Result<Shell, DriveError> {
        let api = &self.config.api;
        let tokens = self.token_source(interactive)?;
        let client: Arc<dyn RemoteListing> = Arc::new(
            GraphClient::new(&api.base_url, tokens, api.timeout(), api.connect_timeout())?
                .with_page_size(api.page_size),
        );

        let root = Entry::root(self.config.drive.root_name.clone());
        let cache = NavigationCache::new(root, Arc::clone(&client), self.runtime.handle().clone());
        let (listener, events) = ChannelListener::new();
        cache.set_listener(Arc::new(listener));

        let directory = dest.unwrap_or_else(|| self.config.download.resolve_directory());
        let downloader = Downloader::new(directory, api.connect_timeout())?;
        info!(base_url = %api.base_url, download_dir = %downloader.directory().display(), "Session opened");

        Ok(Shell::new(
            DriveSession::new(client, cache, downloader),
            events,
            self.runtime.handle().clone(),
        ))
    }

    /// Static token, else token server, else prompt when interactive
    fn token_source(&self, interactive: bool) -> Result<Arc<dyn TokenSource>, DriveError> {
        let auth = &self.config.auth;
        if let Some(token) = auth.access_token.as_deref() {
            if !token.trim().is_empty() {
                return Ok(Arc::new(StaticToken::new(token)));
            }
        }
        if let Some(endpoint) = &auth.token_endpoint {
            return Ok(Arc::new(TokenServer::new(
                endpoint.clone(),
                self.config.api.timeout(),
            )?));
        }
        if interactive {
            let token = dialoguer::Password::new()
                .with_prompt("Access token")
                .interact()
                .map_err(|e| DriveError::Auth(format!("Failed to read access token: {}", e)))?;
            if !token.trim().is_empty() {
                return Ok(Arc::new(StaticToken::new(token)));
            }
        }
        Err(DriveError::Auth(format!(
            "No access token configured; set {} or auth.token_endpoint",
            ACCESS_TOKEN_VAR
        )))
    }
}

/// Split `a/b/file.txt` into the folder path and the file name
fn split_file_path(path: &str) -> Result<(&str, &str), DriveError> {
    let trimmed = path.trim_end_matches('/');
    let (folder, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() {
        return Err(DriveError::InvalidOperation(format!(
            "Path does not name a file: {}",
            path
        )));
    }
    Ok((folder, name))
}
