//! verboard - Backup and version dashboard

mod cli;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use verboard_core::models::{BackupRequest, BackupType};
use verboard_core::{FileConfig, ManagerConfig, VersionManager};

#[derive(Parser)]
#[command(
    name = "verboard",
    version,
    about = "Backup and version dashboard",
    long_about = "Web dashboard and CLI for a versioned application's backups.\n\
                  \n\
                  Lists backup archives, reports system status, and drives the\n\
                  backup/switch scripts under <root>/version_manager/.\n\
                  \n\
                  Examples:\n\
                    verboard                         # Serve dashboard on 127.0.0.1:3000\n\
                    verboard serve --port 8080       # Custom port\n\
                    verboard list                    # Print available backups\n\
                    verboard backup --type beta      # Create a beta backup\n\
                    verboard switch v1.4.0           # Switch the active version\n\
                  \n\
                  Environment Variables:\n\
                    VERBOARD_ROOT                    # Root of the managed application\n\
                    VERBOARD_BACKUPS_DIR             # Override backups directory\n\
                    VERBOARD_STATE_FILE              # Override state file\n\
                    VERBOARD_AUTH_TOKEN              # Require a token on realtime channels\n\
                    VERBOARD_CONFIG                  # Config file path\n\
                    HOST, PORT                       # Listen address for serve\n\
                    RUST_LOG                         # Log filter (default: info)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Root directory of the managed application (default: current directory)
    #[arg(long, env = "VERBOARD_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Directory holding backup archives
    #[arg(long, env = "VERBOARD_BACKUPS_DIR", global = true)]
    backups_dir: Option<PathBuf>,

    /// State document written by the scripts
    #[arg(long, env = "VERBOARD_STATE_FILE", global = true)]
    state_file: Option<PathBuf>,

    /// Shared token for WebSocket/SSE sessions
    #[arg(long, env = "VERBOARD_AUTH_TOKEN", hide_env_values = true, global = true)]
    auth_token: Option<String>,

    /// Config file (default: <config dir>/verboard/config.toml)
    #[arg(long, env = "VERBOARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, env = "VERBOARD_NO_COLOR", global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web dashboard (default)
    Serve {
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short, env = "PORT", default_value = "3000")]
        port: u16,

        /// Serve frontend assets from this directory
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Open the dashboard in a browser
        #[arg(long)]
        open: bool,
    },
    /// Print system status
    Status,
    /// List available backups, newest first
    List,
    /// Create a backup via the backup script
    Backup {
        #[arg(long)]
        name: Option<String>,

        /// stable, beta or manual
        #[arg(long = "type", default_value = "stable")]
        backup_type: BackupType,
    },
    /// Switch the active version via the switch script
    Switch { version: String },
    /// Delete a backup archive
    Delete { filename: String },
    /// Show the change list between two versions
    Changelog { from: String, to: String },
    /// List git tags usable as restore points
    RestorePoints,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve {
        host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000),
        static_dir: None,
        open: false,
    });

    // One-shot commands keep stderr quiet unless RUST_LOG says otherwise
    let default_level = if matches!(command, Command::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    init_tracing(default_level, cli.no_color);

    let config = load_config(
        cli.root,
        cli.backups_dir,
        cli.state_file,
        cli.auth_token,
        cli.config,
    )?;
    let manager = Arc::new(VersionManager::new(config));
    let json = cli.json;
    let no_color = cli.no_color;

    match command {
        Command::Serve {
            host,
            port,
            static_dir,
            open,
        } => run_serve(manager, &host, port, static_dir, open).await?,
        Command::Status => {
            let status = manager.status().await;
            print_output(json, &status, || cli::format_status(&status, no_color))?;
        }
        Command::List => {
            let versions = manager.versions().await?;
            print_output(json, &versions, || {
                cli::format_versions_table(&versions, no_color)
            })?;
        }
        Command::Backup { name, backup_type } => {
            let spinner = cli::spinner("Running backup script...");
            let result = manager
                .create_backup(BackupRequest { name, backup_type })
                .await;
            spinner.finish_and_clear();

            let result = result?;
            print_output(json, &result, || {
                format!("{} ({})", result.message, result.backup_name)
            })?;
        }
        Command::Switch { version } => {
            let spinner = cli::spinner(format!("Switching to {}...", version));
            let result = manager.switch_version(&version).await;
            spinner.finish_and_clear();

            let result = result?;
            print_output(json, &result, || result.message.clone())?;
        }
        Command::Delete { filename } => {
            manager.delete_backup(&filename).await?;
            print_output(json, &serde_json::json!({ "success": true }), || {
                format!("Deleted {}", filename)
            })?;
        }
        Command::Changelog { from, to } => {
            let log = manager.changelog(&from, &to)?;
            print_output(json, &log, || cli::format_changelog(&log))?;
        }
        Command::RestorePoints => {
            let points = manager.restore_points().await;
            print_output(json, &points, || {
                cli::format_restore_points_table(&points, no_color)
            })?;
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str, no_color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}

/// Defaults from the root, then the config file, then flags/env
fn load_config(
    root: Option<PathBuf>,
    backups_dir: Option<PathBuf>,
    state_file: Option<PathBuf>,
    auth_token: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<ManagerConfig> {
    let base_root = match &root {
        Some(r) => r.clone(),
        None => std::env::current_dir().context("Could not determine current directory")?,
    };
    let mut config = ManagerConfig::from_root(base_root);

    let explicit = config_path.is_some();
    if let Some(path) = config_path.or_else(FileConfig::default_path) {
        match FileConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
        {
            Some(mut file) => {
                if root.is_some() {
                    file.root = None;
                }
                config = config.merge_file(file);
            }
            None if explicit => bail!("Config file not found: {}", path.display()),
            None => {}
        }
    }

    if let Some(dir) = backups_dir {
        config.backups_dir = dir;
    }
    if let Some(file) = state_file {
        config.state_file = file;
    }
    if let Some(token) = auth_token {
        config.auth_token = Some(token);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_output<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

async fn run_serve(
    manager: Arc<VersionManager>,
    host: &str,
    port: u16,
    static_dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let addr = resolve_listen_addr(host, port).await?;

    let url = format!("http://{}", addr);
    println!("verboard dashboard: {}", url);
    println!("  backups: {}", manager.config().backups_dir.display());

    if open {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "Failed to open browser");
        }
    }

    verboard_web::run(manager, addr, static_dir).await
}

/// Resolve `host` (IP literal or hostname) to the first listen address
async fn resolve_listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?
        .next()
        .with_context(|| format!("No address found for {}", host))
}
