use crate::model::{is_valid_identifier, Entity, EntityKey};
use crate::store::traits::ReferenceStore;
use anyhow::{Context, Result};
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reference store materialized from a directory of declarative JSON
/// documents. Each `*.json` file holds one entity or an array of entities.
/// `reload()` swaps in a fresh snapshot; scheduling the reload is owned by
/// an external collaborator.
#[derive(Debug)]
pub struct FileReferenceStore {
    dir: PathBuf,
    entries: RwLock<HashMap<EntityKey, Entity>>,
}

impl FileReferenceStore {
    /// Loads the initial snapshot. A missing directory is an empty catalog,
    /// not an error, so a deployment can start before its first sync.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            dir: dir.into(),
            entries: RwLock::new(HashMap::new()),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-reads the source directory and replaces the snapshot wholesale.
    pub fn reload(&self) -> Result<()> {
        let mut entries = HashMap::new();
        if self.dir.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
                .with_context(|| format!("failed to read reference dir {}", self.dir.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();
            for path in paths {
                match read_document(&path) {
                    Ok(entities) => {
                        for entity in entities {
                            entries.insert(entity.key(), entity);
                        }
                    }
                    Err(err) => {
                        warn!("skipping reference document {}: {err:#}", path.display());
                    }
                }
            }
        }
        info!(
            "reference snapshot loaded: {} entities from {}",
            entries.len(),
            self.dir.display()
        );
        *self.entries.write() = entries;
        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Vec<Entity>> {
    let raw = std::fs::read_to_string(path).context("failed to read file")?;
    let value: serde_json::Value = serde_json::from_str(&raw).context("invalid JSON")?;
    let candidates: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut entities = Vec::new();
    for candidate in candidates {
        let entity: Entity = serde_json::from_value(candidate).context("not an entity")?;
        if !is_valid_identifier(&entity.namespace) || !is_valid_identifier(&entity.name) {
            warn!(
                "skipping reference entity with malformed key {:?}/{:?} in {}",
                entity.namespace,
                entity.name,
                path.display()
            );
            continue;
        }
        entities.push(entity);
    }
    Ok(entities)
}

#[async_trait::async_trait]
impl ReferenceStore for FileReferenceStore {
    async fn get_reference(&self, key: &EntityKey) -> Result<Option<Entity>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn list_references(&self, entity_type: &str) -> Result<Vec<Entity>> {
        Ok(self
            .entries
            .read()
            .values()
            .filter(|entity| entity.entity_type == entity_type)
            .cloned()
            .collect())
    }
}
