use serde::{Deserialize, Serialize};

/// What the `SubagentStart` hook learned about a subagent's spawning call,
/// handed to the `SubagentStop` hook of the same agent.
///
/// Stored as one entry of the context store map, keyed by agent id. The
/// start hook is the only writer for a given key and the stop hook removes
/// it; an entry whose stop never fires stays behind until swept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCallContext {
    /// Id of the `Task` call that spawned the agent, when it could be
    /// identified at start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default)]
    pub session_id: String,
    /// When the agent started (RFC 3339).
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub prompt: String,
}
