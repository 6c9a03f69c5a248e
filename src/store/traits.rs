use crate::model::{Entity, EntityKey, OverlayRecord};
use anyhow::Result;

/// Read-only provider of entity definitions ingested from the declarative
/// source. The core never writes here; re-ingestion is owned externally.
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn get_reference(&self, key: &EntityKey) -> Result<Option<Entity>>;
    async fn list_references(&self, entity_type: &str) -> Result<Vec<Entity>>;
}

/// Durable key-value store of per-entity override records: annotations,
/// full bodies for API-created entities, and soft-delete tombstones.
/// Upsert and delete are independent per key; no cross-key transactions.
#[async_trait::async_trait]
pub trait OverlayStore: Send + Sync {
    async fn get_record(&self, key: &EntityKey) -> Result<Option<OverlayRecord>>;
    async fn list_records(&self, entity_type: &str) -> Result<Vec<OverlayRecord>>;
    async fn upsert_record(&self, record: OverlayRecord) -> Result<()>;
    async fn delete_record(&self, key: &EntityKey) -> Result<bool>;
}

#[async_trait::async_trait]
impl<T: ReferenceStore + ?Sized> ReferenceStore for std::sync::Arc<T> {
    async fn get_reference(&self, key: &EntityKey) -> Result<Option<Entity>> {
        (**self).get_reference(key).await
    }

    async fn list_references(&self, entity_type: &str) -> Result<Vec<Entity>> {
        (**self).list_references(entity_type).await
    }
}

#[async_trait::async_trait]
impl<T: OverlayStore + ?Sized> OverlayStore for std::sync::Arc<T> {
    async fn get_record(&self, key: &EntityKey) -> Result<Option<OverlayRecord>> {
        (**self).get_record(key).await
    }

    async fn list_records(&self, entity_type: &str) -> Result<Vec<OverlayRecord>> {
        (**self).list_records(entity_type).await
    }

    async fn upsert_record(&self, record: OverlayRecord) -> Result<()> {
        (**self).upsert_record(record).await
    }

    async fn delete_record(&self, key: &EntityKey) -> Result<bool> {
        (**self).delete_record(key).await
    }
}

/// The pair of stores the Reconciliation Service reads through.
pub trait Store: ReferenceStore + OverlayStore + Send + Sync {}

impl<T: ReferenceStore + OverlayStore + Send + Sync> Store for T {}

/// Pairs a reference store with an overlay store into a single [`Store`],
/// making both injected dependencies explicit at wiring time.
#[derive(Debug, Clone)]
pub struct CatalogStore<R, O> {
    reference: R,
    overlay: O,
}

impl<R: ReferenceStore, O: OverlayStore> CatalogStore<R, O> {
    pub fn new(reference: R, overlay: O) -> Self {
        Self { reference, overlay }
    }
}

#[async_trait::async_trait]
impl<R: ReferenceStore, O: OverlayStore> ReferenceStore for CatalogStore<R, O> {
    async fn get_reference(&self, key: &EntityKey) -> Result<Option<Entity>> {
        self.reference.get_reference(key).await
    }

    async fn list_references(&self, entity_type: &str) -> Result<Vec<Entity>> {
        self.reference.list_references(entity_type).await
    }
}

#[async_trait::async_trait]
impl<R: ReferenceStore, O: OverlayStore> OverlayStore for CatalogStore<R, O> {
    async fn get_record(&self, key: &EntityKey) -> Result<Option<OverlayRecord>> {
        self.overlay.get_record(key).await
    }

    async fn list_records(&self, entity_type: &str) -> Result<Vec<OverlayRecord>> {
        self.overlay.list_records(entity_type).await
    }

    async fn upsert_record(&self, record: OverlayRecord) -> Result<()> {
        self.overlay.upsert_record(record).await
    }

    async fn delete_record(&self, key: &EntityKey) -> Result<bool> {
        self.overlay.delete_record(key).await
    }
}
