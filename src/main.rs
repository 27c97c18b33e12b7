// Contract Risk Assistant - CLI Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use contract_risk_assistant::commands;
use contract_risk_assistant::models::response::CommandResponse;
use contract_risk_assistant::services::identity::{SessionIdentity, UserIdentity};
use contract_risk_assistant::services::presenter::{render_files, render_transcript, UpdatePrinter};
use contract_risk_assistant::storage::config::ConfigService;
use contract_risk_assistant::{AppConfig, AppState, SettingsUpdate};
use contract_risk_core::SessionState;

#[derive(Parser, Debug)]
#[command(name = "contract-risk", version, about = "Contract risk-analysis assistant")]
struct Cli {
    /// Config file (default: ~/.contract-risk/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL for this run
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Use a fixed user id instead of a generated one
    #[arg(long, global = true)]
    user_id: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with the assistant, one message per line on stdin
    Chat,
    /// List uploaded contract files
    Files {
        /// List files of every user, not only the current one
        #[arg(long)]
        all: bool,
    },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Persist new values
    Set {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        chat_path: Option<String>,
        #[arg(long)]
        files_path: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(long)]
        grace_ms: Option<u64>,
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut service = match &cli.config {
        Some(path) => ConfigService::from_path(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;

    init_tracing(&service.get_config().log_level);
    if service.created_default() {
        tracing::info!("Created default config at {}", service.config_path().display());
    }

    let overrides = cli.backend_url.map(|url| SettingsUpdate {
        backend_url: Some(url),
        ..Default::default()
    });
    let settings = commands::get_settings(&service, overrides);

    match cli.command {
        None | Some(Command::Chat) => {
            let state = build_state(effective_config(settings)?, cli.user_id.as_deref())?;
            run_chat(Arc::new(state), cli.json).await
        }
        Some(Command::Files { all }) => {
            let state = build_state(effective_config(settings)?, cli.user_id.as_deref())?;
            let response = commands::list_contract_files(&state, all).await;
            print_response(&response, cli.json, |files| render_files(files))
        }
        Some(Command::Config { action }) => {
            let response = match action {
                None | Some(ConfigAction::Show) => settings,
                Some(ConfigAction::Set {
                    url,
                    chat_path,
                    files_path,
                    timeout_secs,
                    grace_ms,
                    log_level,
                }) => commands::update_settings(
                    &mut service,
                    SettingsUpdate {
                        backend_url: url,
                        chat_path,
                        files_path,
                        request_timeout_secs: timeout_secs,
                        stage_clear_grace_ms: grace_ms,
                        log_level,
                        proxy: None,
                    },
                ),
                Some(ConfigAction::Reset) => commands::reset_settings(&mut service),
            };
            print_response(&response, true, |_| Vec::new())
        }
    }
}

/// stderr so snapshots on stdout stay readable. RUST_LOG wins over config.
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn effective_config(settings: CommandResponse<AppConfig>) -> anyhow::Result<AppConfig> {
    match settings.data {
        Some(config) => Ok(config),
        None => anyhow::bail!(
            "invalid configuration: {}",
            settings.error.unwrap_or_default()
        ),
    }
}

fn build_state(config: AppConfig, user_id: Option<&str>) -> anyhow::Result<AppState> {
    let identity: Arc<dyn UserIdentity> = match user_id {
        Some(id) => Arc::new(SessionIdentity::fixed(id)),
        None => Arc::new(SessionIdentity::generate()),
    };
    tracing::info!("Session user id: {}", identity.user_id());
    AppState::from_config(config, identity).context("failed to initialize")
}

fn print_response<T: serde::Serialize>(
    response: &CommandResponse<T>,
    json: bool,
    render: impl Fn(&T) -> Vec<String>,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else if let Some(data) = &response.data {
        for line in render(data) {
            println!("{}", line);
        }
    }
    match &response.error {
        Some(error) => anyhow::bail!("{}", error),
        None => Ok(()),
    }
}

async fn run_chat(state: Arc<AppState>, json: bool) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel::<SessionState>(64);

    let printer = tokio::spawn(async move {
        let mut printer = UpdatePrinter::new();
        while let Some(snapshot) = rx.recv().await {
            if json {
                match serde_json::to_string(&snapshot) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize snapshot: {}", e),
                }
            } else {
                for line in printer.render(&snapshot) {
                    println!("{}", line);
                }
            }
        }
    });

    if !json {
        println!(
            "Connected to {} as {}. Type a message, /history, or /quit.",
            state.config().backend_url,
            state.user_id()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut turns = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = line.trim();
                if command == "/quit" {
                    break;
                }
                if command == "/history" {
                    let response = commands::get_transcript(&state).await;
                    print_response(&response, json, render_transcript)?;
                    continue;
                }
                let state = Arc::clone(&state);
                let tx = tx.clone();
                turns.spawn(async move { commands::send_message(&state, &line, &tx).await });
            }
            Some(joined) = turns.join_next() => {
                let response = joined.context("chat turn panicked")?;
                if let Some(error) = &response.error {
                    eprintln!("{}", error);
                }
                let Some(data) = &response.data else { continue };
                if data.ignored.as_deref() == Some("turn_in_flight") && !json {
                    println!("(still working on the previous message, ignored)");
                }
            }
        }
    }

    while let Some(joined) = turns.join_next().await {
        if let Ok(response) = joined {
            if let Some(error) = response.error {
                eprintln!("{}", error);
            }
        }
    }
    drop(tx);
    printer.await.context("printer task failed")?;
    Ok(())
}
