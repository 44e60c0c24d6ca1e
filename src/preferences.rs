use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Settings file, relative to the project directory.
const FILENAME: &str = ".claude/subagent-edits.toml";

/// User-facing settings stored in `.claude/subagent-edits.toml`.
///
/// ```toml
/// fuzzy_window_ms = 10000
/// store_file = ".claude/state/subagent-context.json"
/// agents_dir = ".claude/agents"
/// skills_dir = ".claude/skills"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    /// How far before an agent's start a `Task` call may be and still be
    /// matched by type alone.
    #[serde(default = "default_fuzzy_window_ms")]
    pub fuzzy_window_ms: u64,

    /// Context store file shared by the start and stop hooks.
    #[serde(default = "default_store_file")]
    pub store_file: PathBuf,

    /// Directory holding agent definitions (`<type>.md`).
    #[serde(default = "default_agents_dir")]
    pub agents_dir: PathBuf,

    /// Directory holding skills (`<name>/SKILL.md`).
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
}

fn default_fuzzy_window_ms() -> u64 {
    10_000
}

fn default_store_file() -> PathBuf {
    ".claude/state/subagent-context.json".into()
}

fn default_agents_dir() -> PathBuf {
    ".claude/agents".into()
}

fn default_skills_dir() -> PathBuf {
    ".claude/skills".into()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            fuzzy_window_ms: default_fuzzy_window_ms(),
            store_file: default_store_file(),
            agents_dir: default_agents_dir(),
            skills_dir: default_skills_dir(),
        }
    }
}

impl Preferences {
    /// Load settings for the project at `project_dir`.
    ///
    /// A missing file means defaults; missing keys in an existing file are
    /// filled in with defaults via serde.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn fuzzy_window(&self) -> time::Duration {
        time::Duration::milliseconds(self.fuzzy_window_ms.min(i64::MAX as u64) as i64)
    }
}
