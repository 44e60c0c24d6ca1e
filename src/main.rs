mod agents;
mod edits;
mod metadata;
mod preferences;
mod resolve;
mod session;
mod store;
mod transcript;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use preferences::Preferences;
use session::Session;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use store::JsonFileStore;
use tracing_subscriber::EnvFilter;
use types::{HookInput, HookOutput};

/// Environment variable holding the log filter (`warn` when unset).
const LOG_ENV: &str = "SUBAGENT_EDITS_LOG";

#[derive(Parser)]
#[command(name = "subagent-edits", version, about = "Attribute file edits to Claude Code subagents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one hook event read from stdin (the default).
    Hook,
    /// Print what the agent behind a transcript created, edited and deleted.
    Edits {
        /// Path to an `agent-<id>.jsonl` transcript.
        agent_transcript: PathBuf,
        /// Project whose settings and agent definitions to use.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
        /// Agent type to report when the spawning call cannot be found.
        #[arg(long)]
        agent_type: Option<String>,
        /// Leave the saved context in the store.
        #[arg(long)]
        keep_context: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer)
}

fn run_hook() -> Result<Option<String>> {
    let input = read_stdin()?;
    let hook_input: HookInput = serde_json::from_str(&input).context("parsing hook input")?;

    let output: Option<HookOutput> = match &hook_input {
        HookInput::SubagentStart(e) => Session::open(&e.common.cwd, &e.common.session_id)
            .and_then(|s| s.handle_subagent_start(e))?,
        HookInput::SubagentStop(e) => Session::open(&e.common.cwd, &e.common.session_id)
            .and_then(|s| s.handle_subagent_stop(e))?,
        HookInput::Other => None,
    };
    output
        .map(|o| serde_json::to_string(&o).context("serializing hook output"))
        .transpose()
}

fn run_edits(
    agent_transcript: PathBuf,
    project_dir: PathBuf,
    agent_type: Option<String>,
    keep_context: bool,
) -> Result<Option<String>> {
    let prefs = Preferences::load(&project_dir)?;
    let store = JsonFileStore::new(project_dir.join(&prefs.store_file));
    let mut options = edits::EditsOptions::new(&project_dir, &prefs);
    options.fallback_agent_type = agent_type;
    options.retire_context = !keep_context;

    let result = edits::get_agent_edits(&agent_transcript, &store, &options)?;
    tracing::info!(summary = %session::summarize(&result), "collected agent edits");
    let json = serde_json::to_string_pretty(&result).context("serializing result")?;
    Ok(Some(json))
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Hook) {
        Command::Hook => run_hook(),
        Command::Edits {
            agent_transcript,
            project_dir,
            agent_type,
            keep_context,
        } => run_edits(agent_transcript, project_dir, agent_type, keep_context),
    };

    match result {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(err) => {
            eprintln!("subagent-edits: {err:#}");
            process::exit(2);
        }
    }
}
