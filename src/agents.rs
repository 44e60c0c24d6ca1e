use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// An agent definition file and the skills its metadata block declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefinition {
    pub path: PathBuf,
    pub skills: Vec<String>,
}

impl AgentDefinition {
    /// Skill file paths under `skills_dir`, in declaration order.
    pub fn skill_paths(&self, skills_dir: &Path) -> Vec<PathBuf> {
        self.skills
            .iter()
            .map(|name| skill_path(skills_dir, name))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    skills: Option<SkillList>,
}

/// `skills:` may be a YAML list or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkillList {
    List(Vec<String>),
    Inline(String),
}

impl SkillList {
    fn into_names(self) -> Vec<String> {
        let names = match self {
            SkillList::List(items) => items,
            SkillList::Inline(s) => s.split(',').map(String::from).collect(),
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

/// Where the definition for `agent_type` lives, or `None` when the type
/// cannot name a file (empty, or contains a path separator).
pub fn definition_path(agents_dir: &Path, agent_type: &str) -> Option<PathBuf> {
    let usable = !agent_type.is_empty()
        && agent_type != "."
        && agent_type != ".."
        && !agent_type.contains(['/', '\\']);
    usable.then(|| agents_dir.join(format!("{agent_type}.md")))
}

pub fn skill_path(skills_dir: &Path, name: &str) -> PathBuf {
    skills_dir.join(name).join("SKILL.md")
}

/// Load the definition for `agent_type`. A missing file is `None`; an
/// unreadable metadata block still yields the definition, with no skills.
pub fn load_definition(agents_dir: &Path, agent_type: &str) -> Option<AgentDefinition> {
    let path = definition_path(agents_dir, agent_type)?;
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no agent definition");
            return None;
        }
    };
    let skills = match metadata_block(&text).map(serde_yaml::from_str::<Frontmatter>) {
        Some(Ok(front)) => front.skills.map(SkillList::into_names).unwrap_or_default(),
        Some(Err(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable agent metadata");
            Vec::new()
        }
        None => Vec::new(),
    };
    Some(AgentDefinition { path, skills })
}

/// The text between a leading `---` line and the next `---` line. An empty
/// block reads as `{}`.
fn metadata_block(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let block = &rest[..offset];
            return Some(if block.trim().is_empty() { "{}" } else { block });
        }
        offset += line.len();
    }
    None
}
