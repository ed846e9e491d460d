use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PushmockError, PushmockResult};
use crate::scene::snapshot::SceneSnapshot;

/// Listing entry; timestamps are epoch millis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
}

/// Template persistence collaborator. All operations are fallible; callers
/// must leave the in-memory scene untouched when one fails.
pub trait TemplateStore {
    /// All templates, newest first.
    fn list(&self) -> PushmockResult<Vec<TemplateMeta>>;
    fn load(&self, name: &str) -> PushmockResult<SceneSnapshot>;
    fn save(&self, name: &str, data: &SceneSnapshot, thumb: Option<&str>) -> PushmockResult<()>;
    fn delete(&self, name: &str) -> PushmockResult<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TemplateFile {
    name: String,
    data: SceneSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<u64>,
}

/// Directory-of-JSON backend: one `{name}.json` per template. Corrupt or
/// foreign files are skipped from listings with a warning.
#[derive(Clone, Debug)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PushmockResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PushmockError::persist(format!(
                "invalid template name '{name}'"
            )));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    fn read_file(&self, path: &Path) -> PushmockResult<TemplateFile> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PushmockError::persist(format!("read '{}': {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| PushmockError::persist(format!("parse '{}': {e}", path.display())))
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl TemplateStore for FsTemplateStore {
    fn list(&self) -> PushmockResult<Vec<TemplateMeta>> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => {
                return Err(PushmockError::persist(format!(
                    "list '{}': {e}",
                    self.root.display()
                )));
            }
        };
        for entry in entries {
            let entry =
                entry.map_err(|e| PushmockError::persist(format!("list entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_file(&path) {
                Ok(tf) => out.push(TemplateMeta {
                    name: tf.name,
                    thumb: tf.thumb,
                    created: tf.created,
                    updated: tf.updated,
                }),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable template");
                }
            }
        }
        out.sort_by(|a, b| b.updated.unwrap_or(0).cmp(&a.updated.unwrap_or(0)));
        Ok(out)
    }

    fn load(&self, name: &str) -> PushmockResult<SceneSnapshot> {
        let path = self.path_for(name)?;
        Ok(self.read_file(&path)?.data)
    }

    fn save(&self, name: &str, data: &SceneSnapshot, thumb: Option<&str>) -> PushmockResult<()> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.root)
            .map_err(|e| PushmockError::persist(format!("create '{}': {e}", self.root.display())))?;

        // Upserts keep the original creation stamp.
        let created = self
            .read_file(&path)
            .ok()
            .and_then(|existing| existing.created)
            .or_else(|| Some(now_millis()));

        let file = TemplateFile {
            name: name.to_string(),
            data: data.clone(),
            thumb: thumb.map(str::to_string),
            created,
            updated: Some(now_millis()),
        };
        let text = serde_json::to_string_pretty(&file)
            .map_err(|e| PushmockError::serde(format!("serialize template '{name}': {e}")))?;
        std::fs::write(&path, text)
            .map_err(|e| PushmockError::persist(format!("write '{}': {e}", path.display())))?;
        tracing::debug!(name, path = %path.display(), "template saved");
        Ok(())
    }

    fn delete(&self, name: &str) -> PushmockResult<()> {
        let path = self.path_for(name)?;
        std::fs::remove_file(&path)
            .map_err(|e| PushmockError::persist(format!("delete '{}': {e}", path.display())))
    }
}
