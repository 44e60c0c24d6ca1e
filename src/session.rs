use anyhow::{Context, Result};
use crate::edits::{self, AgentEditsResult, EditsOptions};
use crate::metadata::SavedCallContext;
use crate::preferences::Preferences;
use crate::store::{ContextStore, JsonFileStore};
use crate::transcript::{self, Transcript, TRANSCRIPT_EXTENSION};
use crate::types::{HookOutput, SubagentStartInput, SubagentStopInput};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Directory name the runtime uses for a session's nested agent transcripts:
/// `<session_id>/subagents/agent-<id>.jsonl`.
const SUBAGENTS_DIR: &str = "subagents";

fn hint(message: String) -> Option<HookOutput> {
    Some(HookOutput {
        system_message: Some(message),
    })
}

/// Current time as RFC 3339 with millisecond precision.
fn now_rfc3339() -> Result<String> {
    let now = OffsetDateTime::now_utc();
    let now = now
        .replace_nanosecond(u32::from(now.millisecond()) * 1_000_000)
        .context("truncating timestamp")?;
    now.format(&Rfc3339).context("formatting timestamp")
}

// ===================================================================
// Session files: a main transcript plus its agent transcripts
// ===================================================================

/// The transcript files of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFiles {
    pub main: PathBuf,
    /// Agent transcripts belonging to the session, sorted by path.
    pub agents: Vec<PathBuf>,
}

impl SessionFiles {
    /// Collect the session's files in `dir`: `<session_id>.jsonl` plus every
    /// agent transcript in `dir` or `dir/<session_id>/subagents` whose first
    /// record belongs to the session. `None` if the main transcript is absent.
    pub fn discover(dir: &Path, session_id: &str) -> Option<Self> {
        let main = dir.join(format!("{session_id}.{TRANSCRIPT_EXTENSION}"));
        if !main.is_file() {
            return None;
        }
        let nested = dir.join(session_id).join(SUBAGENTS_DIR);
        let mut agents: Vec<PathBuf> = [dir, nested.as_path()]
            .into_iter()
            .flat_map(|d| agent_files(d, session_id))
            .collect();
        agents.sort();
        Some(Self { main, agents })
    }

    /// Find the session an agent transcript belongs to: next to it, or two
    /// levels up when it sits in a `<session_id>/subagents/` directory.
    pub fn for_agent(agent_transcript: &Path, session_id: &str) -> Option<Self> {
        let dir = agent_transcript.parent()?;
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        Self::discover(dir, session_id).or_else(|| {
            let session_dir = dir.parent().filter(|_| dir.ends_with(SUBAGENTS_DIR))?;
            if !session_dir.ends_with(session_id) {
                return None;
            }
            Self::discover(session_dir.parent()?, session_id)
        })
    }
}

/// Agent transcripts in `dir` whose session id is `session_id`. Unreadable
/// directories and files are skipped.
fn agent_files(dir: &Path, session_id: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| transcript::agent_id_from_path(path).is_some())
        .filter(|path| {
            Transcript::peek_session_id(path)
                .ok()
                .flatten()
                .is_some_and(|id| id == session_id)
        })
        .collect()
}

// ===================================================================
// Session: per-project state shared by the hook handlers
// ===================================================================

pub struct Session {
    dir: PathBuf,
    session_id: String,
    prefs: Preferences,
    store: JsonFileStore,
}

impl Session {
    /// Load settings for the project at `cwd` and return a `Session` ready
    /// for use. Nothing is created on disk until a context is saved.
    pub fn open(cwd: &str, session_id: &str) -> Result<Self> {
        let dir = PathBuf::from(cwd);
        let prefs = Preferences::load(&dir)?;
        let store = JsonFileStore::new(dir.join(&prefs.store_file));
        tracing::debug!(session_id, store = %store.path().display(), "opened session");
        Ok(Self {
            dir,
            session_id: session_id.to_string(),
            prefs,
            store,
        })
    }

    fn edits_options(&self) -> EditsOptions {
        EditsOptions::new(&self.dir, &self.prefs)
    }

    // ---------------------------------------------------------------
    // Hook handlers
    // ---------------------------------------------------------------

    /// Remember which `Task` call spawned the agent that is starting.
    ///
    /// The newest call of the agent's type without a result yet is taken as
    /// the spawning one. When there is none the context is still saved so
    /// the stop hook knows the type and start time.
    pub fn handle_subagent_start(&self, input: &SubagentStartInput) -> Result<Option<HookOutput>> {
        let parent_path = Path::new(&input.common.transcript_path);
        let parent = Transcript::load_or_empty(parent_path)
            .with_context(|| format!("reading transcript {}", parent_path.display()))?;

        let pending = parent.pending_spawn_calls();
        let call = pending
            .iter()
            .rev()
            .find(|call| call.agent_type.as_deref() == Some(input.agent_type.as_str()));
        match call {
            Some(call) => tracing::debug!(
                agent_id = %input.agent_id,
                call_id = call.call_id,
                description = call.description.as_deref().unwrap_or(""),
                "matched pending spawning call"
            ),
            None => tracing::debug!(agent_id = %input.agent_id, "no pending spawning call"),
        }

        let context = SavedCallContext {
            tool_use_id: call.map(|c| c.call_id.to_string()),
            agent_type: input.agent_type.clone(),
            session_id: self.session_id.clone(),
            timestamp: now_rfc3339()?,
            prompt: call.map(|c| c.prompt.clone()).unwrap_or_default(),
        };
        self.store
            .save(&input.agent_id, &context)
            .with_context(|| format!("saving context for agent {}", input.agent_id))?;
        Ok(None)
    }

    /// Report what the finished agent changed and retire its context.
    pub fn handle_subagent_stop(&self, input: &SubagentStopInput) -> Result<Option<HookOutput>> {
        let mut options = self.edits_options();
        options.fallback_agent_type = input.agent_type.clone();
        let result = edits::get_agent_edits(
            Path::new(&input.agent_transcript_path),
            &self.store,
            &options,
        )?;
        Ok(hint(summarize(&result)))
    }
}

/// One-line summary for the hook's system message.
pub fn summarize(result: &AgentEditsResult) -> String {
    format!(
        "[subagent-edits] {} agent {}: {} created, {} edited, {} deleted",
        result.subagent_type,
        result.agent_id,
        result.new_files.len(),
        result.edited_files.len(),
        result.deleted_files.len(),
    )
}
