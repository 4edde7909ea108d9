#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use kdm_os::config::{normalize_base_url, ClientConfig};
use kdm_os::fetch::{DocumentFetchService, SnapshotTransport};
use kdm_os::transport::{HttpMutationLog, MutationLog, RecordingMutationLog};
use kdm_os::SessionContext;
use kdm_tools::sync_cli::{execute_sync_command, SyncCommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// kdm - settlement sheet sync client
#[derive(Parser, Debug)]
#[command(name = "kdm", version, about, long_about = None)]
struct Cli {
    /// Settlement id (`$oid`)
    #[arg(long)]
    settlement: String,

    /// Login the session acts as
    #[arg(long)]
    login: String,

    /// Treat the login as a settlement admin
    #[arg(long)]
    admin: bool,

    /// JSON API base (overrides KDM_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Webapp base for form posts (overrides KDM_WEBAPP_URL)
    #[arg(long)]
    webapp_url: Option<String>,

    /// Serve the settlement from an exported JSON document instead of the API
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Record mutations and print them instead of posting
    #[arg(long)]
    dry_run: bool,

    /// Log filter; falls back to RUST_LOG, then warn
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Settlement name, year, tokens and survivor groups
    Summary,
    /// Timeline years with their events and event log lines
    Timeline {
        #[arg(long)]
        year: Option<u32>,
    },
    /// One survivor's numeric attributes
    Survivor { id: String },
    /// Set the current lantern year
    Ly { year: u32 },
    /// Add (positive) or spend (negative) endeavor tokens, one at a time
    Tokens {
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Toggle a survivor between available and departing
    Depart { survivor_id: String },
    /// Save the current quarry and record it on the timeline
    Quarry { name: String },
}

impl From<Commands> for SyncCommand {
    fn from(c: Commands) -> Self {
        match c {
            Commands::Summary => Self::Summary,
            Commands::Timeline { year } => Self::Timeline { year },
            Commands::Survivor { id } => Self::Survivor { id },
            Commands::Ly { year } => Self::SetYear { year },
            Commands::Tokens { delta } => Self::Tokens { delta },
            Commands::Depart { survivor_id } => Self::Depart { survivor_id },
            Commands::Quarry { name } => Self::Quarry { name },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url.as_deref() {
        config.api_url = normalize_base_url(url);
    }
    if let Some(url) = cli.webapp_url.as_deref() {
        config.webapp_url = normalize_base_url(url);
    }

    let fetch = match cli.snapshot.as_ref() {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let document: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("parsing snapshot {}", path.display()))?;
            DocumentFetchService::new(Box::new(SnapshotTransport::for_document(
                &cli.settlement,
                document,
            )))
        }
        None => DocumentFetchService::http(&config),
    };

    let recording = RecordingMutationLog::new();
    let offline = cli.dry_run || cli.snapshot.is_some();
    let mutations: Box<dyn MutationLog> = if offline {
        Box::new(recording.clone())
    } else {
        Box::new(HttpMutationLog::new(&config))
    };

    let mut session = SessionContext::new(
        fetch,
        mutations,
        Duration::from_millis(config.manageable_settle_ms),
    );
    session
        .initialize("cli", &cli.login, cli.admin, &config.api_url, &cli.settlement)
        .context("invalid session parameters")?;

    let command = SyncCommand::from(cli.command);
    let output = execute_sync_command(&mut session, &command).map_err(|e| anyhow!(e))?;
    if !output.is_empty() {
        println!("{output}");
    }

    if offline && !recording.is_empty() {
        info!("{} mutations recorded, none sent", recording.len());
        for line in recording.wire_lines() {
            println!("would post: {line}");
        }
    }
    Ok(())
}

fn init_tracing(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
