use crate::agents;
use crate::preferences::Preferences;
use crate::resolve::{self, Hints};
use crate::session::SessionFiles;
use crate::store::ContextStore;
use crate::transcript::Transcript;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Agent type reported when nothing identifies it.
pub const UNKNOWN_AGENT_TYPE: &str = "unknown";

/// The agent transcript and its parent could not be paired. No partial
/// result is meaningful in these cases.
#[derive(Debug, Error)]
pub enum EditsError {
    #[error("agent transcript {} has no records", .path.display())]
    EmptyTranscript { path: PathBuf },
    #[error("cannot derive an agent id from {}", .path.display())]
    MissingAgentId { path: PathBuf },
    #[error("parent transcript for session {session_id} not found near {}", .path.display())]
    ParentNotFound { session_id: String, path: PathBuf },
    #[error("reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything known about what one subagent was and what it changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEditsResult {
    pub session_id: String,
    pub agent_id: String,
    pub agent_transcript_path: PathBuf,
    pub parent_transcript_path: PathBuf,
    pub subagent_type: String,
    pub agent_prompt: String,
    pub agent_definition_path: Option<PathBuf>,
    pub skill_paths: Vec<PathBuf>,
    pub new_files: Vec<String>,
    pub deleted_files: Vec<String>,
    pub edited_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditsOptions {
    /// Type reported by the caller, used when nothing better is found.
    pub fallback_agent_type: Option<String>,
    pub agents_dir: PathBuf,
    pub skills_dir: PathBuf,
    pub fuzzy_window: time::Duration,
    /// Remove the saved context once read.
    pub retire_context: bool,
}

impl EditsOptions {
    pub fn new(project_dir: &Path, prefs: &Preferences) -> Self {
        Self {
            fallback_agent_type: None,
            agents_dir: project_dir.join(&prefs.agents_dir),
            skills_dir: project_dir.join(&prefs.skills_dir),
            fuzzy_window: prefs.fuzzy_window(),
            retire_context: true,
        }
    }
}

fn load_transcript(path: &Path) -> Result<Transcript, EditsError> {
    Transcript::load_or_empty(path).map_err(|source| EditsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// First non-empty value.
fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

/// Pair the agent transcript at `agent_transcript` with its spawning call
/// and collect the files it created, edited and deleted.
pub fn get_agent_edits(
    agent_transcript: &Path,
    store: &dyn ContextStore,
    options: &EditsOptions,
) -> Result<AgentEditsResult, EditsError> {
    let transcript = load_transcript(agent_transcript)?;
    let session_id = match transcript.session_id() {
        Some(id) if !transcript.records().is_empty() => id.to_string(),
        _ => {
            return Err(EditsError::EmptyTranscript {
                path: agent_transcript.to_path_buf(),
            })
        }
    };
    let agent_id = transcript
        .agent_id()
        .ok_or_else(|| EditsError::MissingAgentId {
            path: agent_transcript.to_path_buf(),
        })?
        .to_string();

    let session = SessionFiles::for_agent(agent_transcript, &session_id).ok_or_else(|| {
        EditsError::ParentNotFound {
            session_id: session_id.clone(),
            path: agent_transcript.to_path_buf(),
        }
    })?;
    tracing::debug!(
        parent = %session.main.display(),
        agents = session.agents.len(),
        "found session transcripts"
    );
    let parent = load_transcript(&session.main)?;

    let saved = store.load(&agent_id).unwrap_or_else(|e| {
        tracing::warn!(agent_id = %agent_id, error = %format!("{e:#}"), "context store unavailable");
        None
    });

    let hints = Hints {
        call_id: saved.as_ref().and_then(|c| c.tool_use_id.as_deref()),
        agent_type: first_present([
            saved.as_ref().map(|c| c.agent_type.as_str()),
            options.fallback_agent_type.as_deref(),
        ]),
        started_at: first_present([
            saved.as_ref().map(|c| c.timestamp.as_str()),
            transcript.first_timestamp(),
        ]),
        window: options.fuzzy_window,
    };
    let resolution = resolve::resolve(&parent, &agent_id, &hints);

    let subagent_type = first_present([
        resolution.as_ref().and_then(|r| r.agent_type.as_deref()),
        saved.as_ref().map(|c| c.agent_type.as_str()),
        options.fallback_agent_type.as_deref(),
    ])
    .unwrap_or(UNKNOWN_AGENT_TYPE)
    .to_string();
    let agent_prompt = first_present([
        resolution.as_ref().map(|r| r.prompt.as_str()),
        saved.as_ref().map(|c| c.prompt.as_str()),
    ])
    .unwrap_or_default()
    .to_string();

    let definition = if subagent_type == UNKNOWN_AGENT_TYPE {
        None
    } else {
        agents::load_definition(&options.agents_dir, &subagent_type)
    };
    let skill_paths = definition
        .as_ref()
        .map(|d| d.skill_paths(&options.skills_dir))
        .unwrap_or_default();

    let result = AgentEditsResult {
        session_id,
        agent_id,
        agent_transcript_path: agent_transcript.to_path_buf(),
        parent_transcript_path: parent.path().to_path_buf(),
        subagent_type,
        agent_prompt,
        agent_definition_path: definition.map(|d| d.path),
        skill_paths,
        new_files: transcript.new_files(),
        deleted_files: transcript.deleted_files().into_iter().collect(),
        edited_files: transcript.edited_files().into_iter().collect(),
    };

    if options.retire_context {
        if let Err(e) = store.remove(&result.agent_id) {
            tracing::warn!(agent_id = %result.agent_id, error = %format!("{e:#}"), "could not retire saved context");
        }
    }

    Ok(result)
}
