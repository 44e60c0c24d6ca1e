use serde::{Deserialize, Deserializer};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub mod query;
pub mod shell;

/// Filename prefix of a subagent transcript: `agent-<id>.jsonl`.
pub const AGENT_FILE_PREFIX: &str = "agent-";

/// Extension shared by every transcript file.
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

// ===================================================================
// Top-level record: one per JSONL line
// ===================================================================

/// A single line in a Claude Code `.jsonl` transcript file.
///
/// Discriminated by the `type` field. Lines with any other `type` are
/// dropped by the parser rather than modelled.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Record {
    #[serde(rename = "user")]
    User(UserRecord),
    #[serde(rename = "assistant")]
    Assistant(AssistantRecord),
    #[serde(rename = "system")]
    System(SystemRecord),
    #[serde(rename = "summary")]
    Summary(SummaryRecord),
    #[serde(rename = "file-history-snapshot")]
    Snapshot(SnapshotRecord),
}

/// Fields every record carries. `uuid`, `timestamp` and `sessionId` are
/// required; a line without them is not a record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHeader {
    pub uuid: String,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    pub timestamp: String,
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub is_sidechain: bool,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub message: Message,
    /// Structured result the runtime attaches next to a `tool_result`
    /// chunk. Its shape depends on the tool; for a spawned agent it carries
    /// the `agentId`.
    #[serde(default)]
    pub tool_use_result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub leaf_uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
}

// ===================================================================
// Message content
// ===================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: MessageContent,
}

/// `message.content` is either a plain string (typed user text) or an
/// array of content chunks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Chunks(Vec::new())
    }
}

impl MessageContent {
    /// The chunk list, or an empty slice for plain-text content.
    pub fn chunks(&self) -> &[ContentChunk] {
        match self {
            MessageContent::Chunks(chunks) => chunks,
            MessageContent::Text(_) => &[],
        }
    }
}

/// One entry of a `message.content` array.
///
/// Chunk kinds this crate does not care about (thinking, images, ...) and
/// known kinds missing a required field are kept as `Unrecognized` with the
/// raw JSON, so a new chunk kind never fails the whole line.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentChunk {
    Text(String),
    ToolInvocation(ToolInvocation),
    ToolResult(ToolResult),
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
}

impl ContentChunk {
    fn from_value(raw: serde_json::Value) -> Self {
        let parsed = match raw.get("type").and_then(|t| t.as_str()) {
            Some("text") => raw
                .get("text")
                .and_then(|t| t.as_str())
                .map(|t| ContentChunk::Text(t.to_string())),
            Some("tool_use") => ToolInvocation::deserialize(&raw)
                .ok()
                .map(ContentChunk::ToolInvocation),
            Some("tool_result") => ToolResult::deserialize(&raw)
                .ok()
                .map(ContentChunk::ToolResult),
            _ => None,
        };
        parsed.unwrap_or(ContentChunk::Unrecognized(raw))
    }
}

impl<'de> Deserialize<'de> for ContentChunk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(ContentChunk::from_value(raw))
    }
}

impl Record {
    pub fn header(&self) -> &RecordHeader {
        match self {
            Self::User(r) => &r.header,
            Self::Assistant(r) => &r.header,
            Self::System(r) => &r.header,
            Self::Summary(r) => &r.header,
            Self::Snapshot(r) => &r.header,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.header().timestamp
    }

    pub fn session_id(&self) -> &str {
        &self.header().session_id
    }
}

/// Parse one transcript line.
///
/// Fails on invalid JSON, an unknown `type`, or a record whose id,
/// timestamp or session id is missing or empty.
pub fn parse_line(raw: &str) -> Result<Record, String> {
    let record: Record = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let header = record.header();
    if header.uuid.is_empty() || header.timestamp.is_empty() || header.session_id.is_empty() {
        return Err("record is missing uuid, timestamp or sessionId".into());
    }
    Ok(record)
}

/// Extract the agent id from a transcript filename (`agent-<id>.jsonl`).
pub fn agent_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(TRANSCRIPT_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix(AGENT_FILE_PREFIX)?;
    if id.is_empty() { None } else { Some(id.to_string()) }
}

// ===================================================================
// Transcript: one parsed JSONL file plus identity derived from it
// ===================================================================

/// A parsed Claude Code JSONL transcript.
///
/// Records are kept in file order. The agent id comes from the filename
/// only, so it is known even when no line parses.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    path: PathBuf,
    records: Vec<Record>,
    session_id: Option<String>,
    agent_id: Option<String>,
}

impl Transcript {
    /// Parse JSONL `contents` read from `path`. Returns the transcript and
    /// the lines that were dropped (1-based line number and reason).
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> (Self, Vec<(usize, String)>) {
        let path = path.into();
        let mut records = Vec::new();
        let mut dropped = Vec::new();

        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(record) => records.push(record),
                Err(e) => dropped.push((i + 1, e)),
            }
        }

        let session_id = records.first().map(|r| r.session_id().to_string());
        let agent_id = agent_id_from_path(&path);
        (
            Self {
                path,
                records,
                session_id,
                agent_id,
            },
            dropped,
        )
    }

    /// Read and parse a transcript file. Dropped lines are logged at debug
    /// level and otherwise ignored.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let (transcript, dropped) = Self::parse(path, &contents);
        for (line, reason) in &dropped {
            tracing::debug!(path = %path.display(), line, %reason, "dropped transcript line");
        }
        tracing::debug!(
            path = %path.display(),
            records = transcript.records.len(),
            agent = transcript.is_agent(),
            "loaded transcript"
        );
        Ok(transcript)
    }

    /// Like `load`, but a missing file yields an empty transcript.
    pub fn load_or_empty(path: &Path) -> io::Result<Self> {
        match Self::load(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::parse(path, "").0),
            other => other,
        }
    }

    /// Session id of the first valid record in `path`, reading no further
    /// than needed.
    pub fn peek_session_id(path: &Path) -> io::Result<Option<String>> {
        let reader = BufReader::new(fs::File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Ok(record) = parse_line(line) {
                return Ok(Some(record.session_id().to_string()));
            }
        }
        Ok(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in file order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The agent id parsed from the filename, if this is an agent transcript.
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn is_agent(&self) -> bool {
        self.agent_id.is_some()
    }

    /// Timestamp of the first record, used as the agent's start time.
    pub fn first_timestamp(&self) -> Option<&str> {
        self.records.first().map(|r| r.timestamp())
    }
}
