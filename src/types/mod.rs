use serde::{Deserialize, Serialize};

// ===================================================================
// Hook Input Types (received via stdin, snake_case JSON)
// ===================================================================

/// Fields shared by all hook event inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonInput {
    pub session_id: String,
    /// Transcript of the main session (the parent of any subagent).
    pub transcript_path: String,
    pub cwd: String,
}

/// Fired when a subagent begins. This is the only moment the spawning
/// `Task` call is known to be the newest pending one of its type.
#[derive(Debug, Deserialize)]
pub struct SubagentStartInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub agent_id: String,
    pub agent_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SubagentStopInput {
    #[serde(flatten)]
    pub common: CommonInput,
    pub agent_id: String,
    #[serde(default)]
    pub agent_type: Option<String>,
    pub agent_transcript_path: String,
}

/// Top-level hook input, deserialized from stdin JSON.
///
/// Tagged by the `hook_event_name` field. Events this tool does not handle
/// deserialize to `Other` and pass through.
#[derive(Debug, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookInput {
    SubagentStart(SubagentStartInput),
    SubagentStop(SubagentStopInput),
    #[serde(other)]
    Other,
}

// ===================================================================
// Tool-Specific Input Types
// ===================================================================

/// Input of the spawning tool (`Task` / `Agent`). Every field is optional
/// so a partial input still yields whatever it does carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpawnToolInput {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subagent_type: Option<String>,
}

// ===================================================================
// Hook Output Types (written to stdout as JSON, camelCase)
// ===================================================================

/// Top-level hook output written to stdout on exit code 0.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Message shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}
