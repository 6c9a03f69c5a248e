use crate::model::{Entity, EntityKey, OverlayRecord};
use crate::store::traits::{OverlayStore, ReferenceStore};
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory reference store. Backs tests and development setups; the
/// production ingestion path lives in [`crate::store::FileReferenceStore`].
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    entries: RwLock<HashMap<EntityKey, Entity>>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces or adds a reference entity, simulating an ingestion cycle.
    pub fn insert(&self, entity: Entity) {
        self.entries.write().insert(entity.key(), entity);
    }

    pub fn remove(&self, key: &EntityKey) {
        self.entries.write().remove(key);
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MemoryReferenceStore {
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

/// In-memory overlay store with the same upsert/delete-by-key contract as
/// the PostgreSQL implementation.
#[derive(Debug, Default)]
pub struct MemoryOverlayStore {
    records: RwLock<HashMap<EntityKey, OverlayRecord>>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OverlayStore for MemoryOverlayStore {
    async fn get_record(&self, key: &EntityKey) -> Result<Option<OverlayRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn list_records(&self, entity_type: &str) -> Result<Vec<OverlayRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.entity.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn upsert_record(&self, record: OverlayRecord) -> Result<()> {
        self.records.write().insert(record.entity.key(), record);
        Ok(())
    }

    async fn delete_record(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.records.write().remove(key).is_some())
    }
}
