use crate::transcript::query::SpawnCall;
use crate::transcript::{Record, ContentChunk, Transcript};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

/// How far before the agent's start the time-window strategy looks.
pub const DEFAULT_WINDOW: Duration = Duration::seconds(10);

// ===================================================================
// Input: what the caller knows about the agent besides its id
// ===================================================================

#[derive(Debug, Clone, Copy)]
pub struct Hints<'a> {
    /// Spawning call id saved by the start hook.
    pub call_id: Option<&'a str>,
    pub agent_type: Option<&'a str>,
    /// When the agent started (RFC 3339).
    pub started_at: Option<&'a str>,
    pub window: Duration,
}

impl Default for Hints<'_> {
    fn default() -> Self {
        Self {
            call_id: None,
            agent_type: None,
            started_at: None,
            window: DEFAULT_WINDOW,
        }
    }
}

// ===================================================================
// Output: the originating call
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub call_id: String,
    pub agent_type: Option<String>,
    pub prompt: String,
    /// Name of the strategy that found the call.
    pub strategy: &'static str,
}

impl Resolution {
    fn from_call(call: &SpawnCall<'_>, strategy: &'static str) -> Self {
        Self {
            call_id: call.call_id.to_string(),
            agent_type: call.agent_type.clone(),
            prompt: call.prompt.clone(),
            strategy,
        }
    }
}

// ===================================================================
// Strategies, tried in order until one finds the call
// ===================================================================

type Strategy = fn(&[SpawnCall<'_>], &Transcript, &str, &Hints<'_>) -> Option<Resolution>;

/// Most authoritative first.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", direct_lookup),
    ("back-reference", back_reference),
    ("time-window", time_window),
];

/// Find the call in `parent` that spawned agent `agent_id`.
///
/// `None` means the type is unknown, not that anything went wrong.
pub fn resolve(parent: &Transcript, agent_id: &str, hints: &Hints<'_>) -> Option<Resolution> {
    let calls = parent.spawn_calls();
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let hit = strategy(&calls, parent, agent_id, hints);
        tracing::debug!(agent_id, strategy = *name, found = hit.is_some(), "resolving spawning call");
        hit
    })
}

/// The call id saved at spawn time, looked up directly.
fn direct_lookup(
    calls: &[SpawnCall<'_>],
    _parent: &Transcript,
    _agent_id: &str,
    hints: &Hints<'_>,
) -> Option<Resolution> {
    let call_id = hints.call_id?;
    calls
        .iter()
        .find(|call| call.call_id == call_id)
        .map(|call| Resolution::from_call(call, "direct"))
}

/// A written-back tool result whose structured result names the agent.
/// Only exists once the agent has finished.
fn back_reference(
    calls: &[SpawnCall<'_>],
    parent: &Transcript,
    agent_id: &str,
    _hints: &Hints<'_>,
) -> Option<Resolution> {
    parent
        .records()
        .iter()
        .filter_map(|record| match record {
            Record::User(r) => Some(r),
            _ => None,
        })
        .filter(|r| {
            r.tool_use_result
                .as_ref()
                .and_then(|result| result.get("agentId"))
                .and_then(|id| id.as_str())
                == Some(agent_id)
        })
        .flat_map(|r| r.message.content.chunks())
        .filter_map(|chunk| match chunk {
            ContentChunk::ToolResult(result) => Some(result.tool_use_id.as_str()),
            _ => None,
        })
        .find_map(|call_id| calls.iter().find(|call| call.call_id == call_id))
        .map(|call| Resolution::from_call(call, "back-reference"))
}

/// The latest call of the hinted type made no later than, and within
/// `window` of, the agent's start.
fn time_window(
    calls: &[SpawnCall<'_>],
    _parent: &Transcript,
    _agent_id: &str,
    hints: &Hints<'_>,
) -> Option<Resolution> {
    let agent_type = hints.agent_type?;
    let started_at = parse_timestamp(hints.started_at?)?;
    calls
        .iter()
        .filter(|call| call.agent_type.as_deref() == Some(agent_type))
        .filter_map(|call| parse_timestamp(call.timestamp).map(|ts| (ts, call)))
        .filter(|(ts, _)| {
            let lead = started_at - *ts;
            lead >= Duration::ZERO && lead <= hints.window
        })
        .max_by_key(|(ts, _)| *ts)
        .map(|(_, call)| Resolution::from_call(call, "time-window"))
}

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok()
}

#[cfg(test)]
mod tests;
