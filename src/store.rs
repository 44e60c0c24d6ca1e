use crate::metadata::SavedCallContext;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Saved contexts keyed by agent id.
pub type ContextMap = BTreeMap<String, SavedCallContext>;

/// Keyed handoff between the start and stop hooks of a subagent.
///
/// `load` returning `None` is the normal case for agents that started
/// before a context was ever saved.
pub trait ContextStore {
    fn save(&self, agent_id: &str, context: &SavedCallContext) -> Result<()>;
    fn load(&self, agent_id: &str) -> Result<Option<SavedCallContext>>;
    fn remove(&self, agent_id: &str) -> Result<()>;
}

/// A `ContextStore` backed by one JSON object file.
///
/// Each write goes to its own temp file in the same directory and is then
/// renamed over the store, so readers never see a torn file. There is no
/// lock: two agents starting at the same instant can both read the old map,
/// and the later rename drops the other's entry.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole map. A missing or unparseable file is an empty map.
    pub fn read_all(&self) -> Result<ContextMap> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ContextMap::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable context store");
                Ok(ContextMap::new())
            }
        }
    }

    fn write_all(&self, map: &ContextMap) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let json = serde_json::to_string_pretty(map).context("serializing context store")?;
        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        let tmp_path = tmp.path().to_path_buf();
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        tmp.flush()
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl ContextStore for JsonFileStore {
    fn save(&self, agent_id: &str, context: &SavedCallContext) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(agent_id.to_string(), context.clone());
        self.write_all(&map)
    }

    fn load(&self, agent_id: &str) -> Result<Option<SavedCallContext>> {
        Ok(self.read_all()?.remove(agent_id))
    }

    fn remove(&self, agent_id: &str) -> Result<()> {
        let mut map = self.read_all()?;
        if map.remove(agent_id).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

/// In-memory store for exercising callers without touching disk.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: std::cell::RefCell<ContextMap>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn contains(&self, agent_id: &str) -> bool {
        self.map.borrow().contains_key(agent_id)
    }
}

#[cfg(test)]
impl ContextStore for MemoryStore {
    fn save(&self, agent_id: &str, context: &SavedCallContext) -> Result<()> {
        self.map
            .borrow_mut()
            .insert(agent_id.to_string(), context.clone());
        Ok(())
    }

    fn load(&self, agent_id: &str) -> Result<Option<SavedCallContext>> {
        Ok(self.map.borrow().get(agent_id).cloned())
    }

    fn remove(&self, agent_id: &str) -> Result<()> {
        self.map.borrow_mut().remove(agent_id);
        Ok(())
    }
}
