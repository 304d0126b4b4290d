//! Prompt Vault - a personal prompt manager for the terminal.
//!
//! Prompts are kept on this device. The offline commands manage the cached
//! copy of the web front-end so it keeps loading without a network.

mod app;
mod clipboard;
mod commands;
mod config;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use clipboard::{Osc52Clipboard, SystemClipboard};
use config::Config;

/// Name of the rolling log file in the log directory
const LOG_FILE_NAME: &str = "promptvault.log";

#[derive(Parser, Debug)]
#[command(name = "promptvault")]
#[command(about = "Save, search and reuse your prompts")]
#[command(version)]
struct Args {
    /// Path to config file (default: $XDG_CONFIG_HOME/promptvault/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the prompt collection
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the config file, keeping settings not given here
    Init {
        /// Origin serving the web front-end, e.g. https://user.github.io
        #[arg(long)]
        origin: Option<String>,
        /// Offline cache generation
        #[arg(long)]
        cache_version: Option<u32>,
    },
    /// List prompts, newest first, optionally filtered
    List {
        /// Matches title, text or tag, ignoring case
        query: Option<String>,
    },
    /// Print a prompt in full
    Show { id: String },
    /// Save a new prompt
    Add {
        #[arg(long)]
        title: String,
        /// Prompt text, or `-` to read it from stdin
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// Change a saved prompt
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Prompt text, or `-` to read it from stdin
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Delete a prompt
    Delete {
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Copy a prompt's text to the clipboard
    Copy { id: String },
    /// Manage the offline copy of the web front-end
    #[command(subcommand)]
    Offline(OfflineCommand),
}

#[derive(Subcommand, Debug)]
enum OfflineCommand {
    /// Download the front-end assets and make them the active cache
    Install,
    /// Show the active cache and every cache on disk
    Status,
    /// Request a path the way the browser would, cache first
    Fetch {
        path: String,
        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
        #[arg(long, default_value = "GET")]
        method: String,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`). With a log
/// directory they are also written to a daily file there; keep the returned
/// guard alive until exit so the file is flushed.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if let Command::Init {
        origin,
        cache_version,
    } = args.command
    {
        return init_config(args.config, origin, cache_version);
    }

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    let log_dir = if config.log_to_file {
        Some(config.log_dir()?)
    } else {
        None
    };
    let _guard = init_tracing(log_dir);
    debug!(?config, "Config loaded");

    let mut app = App::new(config)?;
    run(&mut app, args.command).await
}

fn init_config(
    path: Option<PathBuf>,
    origin: Option<String>,
    cache_version: Option<u32>,
) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => Config::config_path()?,
    };
    let mut config = if path.exists() {
        Config::read(&path)?
    } else {
        Config::default()
    };
    if origin.is_some() {
        config.origin = origin;
    }
    if cache_version.is_some() {
        config.cache_version = cache_version;
    }

    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run(app: &mut App, command: Command) -> Result<()> {
    let mut out = io::stdout().lock();

    match command {
        Command::Init { .. } => Ok(()),
        Command::List { query } => {
            commands::list(&app.store, query.as_deref().unwrap_or(""), &mut out)
        }
        Command::Show { id } => commands::show(&app.store, &id, &mut out),
        Command::Add { title, text, tag } => {
            let text = commands::read_text(&text, io::stdin().lock())?;
            commands::add(&mut app.store, &title, &text, &tag, &mut out)
        }
        Command::Edit { id, title, text, tag } => {
            let text = text
                .map(|t| commands::read_text(&t, io::stdin().lock()))
                .transpose()?;
            commands::edit(
                &mut app.store,
                &id,
                title.as_deref(),
                text.as_deref(),
                tag.as_deref(),
                &mut out,
            )
        }
        Command::Delete { id, yes } => {
            if yes {
                commands::delete(&mut app.store, &id, &|_: &str| true, &mut out)
            } else {
                let ask = |message: &str| commands::ask(message, io::stdin().lock(), io::stderr());
                commands::delete(&mut app.store, &id, &ask, &mut out)
            }
        }
        Command::Copy { id } => {
            let primary = SystemClipboard::new();
            commands::copy(&app.store, &id, &primary, &Osc52Clipboard, &mut out)
        }
        Command::Offline(command) => {
            let Some(offline) = app.offline().await? else {
                anyhow::bail!(
                    "No origin configured: set `origin` in {} or PROMPTVAULT_ORIGIN",
                    Config::config_path()?.display()
                );
            };

            match command {
                OfflineCommand::Install => {
                    let result = commands::offline_install(&offline, &mut out).await;
                    if result.is_ok() {
                        info!(cache = offline.manifest.cache_name(), "Offline copy installed");
                    }
                    result
                }
                OfflineCommand::Status => commands::offline_status(&offline, &mut out).await,
                OfflineCommand::Fetch {
                    path,
                    navigate,
                    method,
                } => commands::offline_fetch(&offline, &path, navigate, &method, &mut out).await,
            }
        }
    }
}
