use super::{ContentChunk, Record, ToolInvocation, Transcript};
use crate::types::SpawnToolInput;
use std::collections::{BTreeSet, HashSet};

/// Tool that creates (or overwrites) a whole file.
pub const WRITE_TOOL: &str = "Write";
/// Tool that patches an existing file in place.
pub const EDIT_TOOL: &str = "Edit";
/// Tool that runs a shell command.
pub const SHELL_TOOL: &str = "Bash";
/// Tools that spawn a subagent. `Agent` is the newer name for `Task`.
pub const SPAWN_TOOLS: &[&str] = &["Task", "Agent"];

/// A tool invocation paired with the timestamp of the assistant record
/// that made it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub invocation: &'a ToolInvocation,
    pub timestamp: &'a str,
}

/// A spawning-tool invocation with its declared subagent type and prompt
/// pulled out of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnCall<'a> {
    pub call_id: &'a str,
    pub timestamp: &'a str,
    pub agent_type: Option<String>,
    pub prompt: String,
    pub description: Option<String>,
}

/// A tool invocation that may touch the file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation<'a> {
    Write { path: &'a str },
    Edit { path: &'a str },
    Shell { command: &'a str },
}

impl Transcript {
    /// Every tool invocation from assistant records, in file order.
    pub fn tool_uses(&self) -> Vec<ToolUse<'_>> {
        self.records
            .iter()
            .filter_map(|record| match record {
                Record::Assistant(r) => Some((r.header.timestamp.as_str(), r.message.content.chunks())),
                _ => None,
            })
            .flat_map(|(timestamp, chunks)| {
                chunks.iter().filter_map(move |chunk| match chunk {
                    ContentChunk::ToolInvocation(invocation) => Some(ToolUse {
                        invocation,
                        timestamp,
                    }),
                    _ => None,
                })
            })
            .collect()
    }

    /// Call ids that have a `tool_result` in some user record.
    pub fn completed_tool_ids(&self) -> HashSet<&str> {
        self.records
            .iter()
            .filter_map(|record| match record {
                Record::User(r) => Some(r.message.content.chunks()),
                _ => None,
            })
            .flatten()
            .filter_map(|chunk| match chunk {
                ContentChunk::ToolResult(result) => Some(result.tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every spawning-tool invocation, in file order.
    pub fn spawn_calls(&self) -> Vec<SpawnCall<'_>> {
        self.tool_uses()
            .into_iter()
            .filter(|tu| SPAWN_TOOLS.contains(&tu.invocation.name.as_str()))
            .map(|tu| {
                let input: SpawnToolInput =
                    serde_json::from_value(tu.invocation.input.clone()).unwrap_or_default();
                SpawnCall {
                    call_id: &tu.invocation.id,
                    timestamp: tu.timestamp,
                    agent_type: input.subagent_type.filter(|t| !t.is_empty()),
                    prompt: input.prompt,
                    description: input.description,
                }
            })
            .collect()
    }

    /// Spawning-tool invocations that have no result written back yet.
    pub fn pending_spawn_calls(&self) -> Vec<SpawnCall<'_>> {
        let completed = self.completed_tool_ids();
        self.spawn_calls()
            .into_iter()
            .filter(|call| !completed.contains(call.call_id))
            .collect()
    }

    /// File-affecting invocations, in file order. Invocations missing their
    /// path or command field are skipped.
    pub fn file_operations(&self) -> Vec<FileOperation<'_>> {
        self.tool_uses()
            .into_iter()
            .filter_map(|tu| {
                let input = &tu.invocation.input;
                match tu.invocation.name.as_str() {
                    WRITE_TOOL => input["file_path"]
                        .as_str()
                        .map(|path| FileOperation::Write { path }),
                    EDIT_TOOL => input["file_path"]
                        .as_str()
                        .map(|path| FileOperation::Edit { path }),
                    SHELL_TOOL => input["command"]
                        .as_str()
                        .map(|command| FileOperation::Shell { command }),
                    _ => None,
                }
            })
            .collect()
    }

    /// Every path written or edited.
    pub fn edited_files(&self) -> BTreeSet<String> {
        self.file_operations()
            .into_iter()
            .filter_map(|op| match op {
                FileOperation::Write { path } | FileOperation::Edit { path } => {
                    Some(path.to_string())
                }
                FileOperation::Shell { .. } => None,
            })
            .collect()
    }

    /// Paths created by a write, in order of first creation. A second write
    /// to the same path is an overwrite and is not listed again.
    pub fn new_files(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.file_operations()
            .into_iter()
            .filter_map(|op| match op {
                FileOperation::Write { path } if seen.insert(path) => Some(path.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Paths removed by `rm` in shell commands.
    pub fn deleted_files(&self) -> BTreeSet<String> {
        self.file_operations()
            .into_iter()
            .filter_map(|op| match op {
                FileOperation::Shell { command } => Some(super::shell::deleted_paths(command)),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
