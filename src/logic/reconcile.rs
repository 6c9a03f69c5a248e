use chrono::Utc;
use itertools::Itertools;
use log::{debug, info};
use std::collections::HashMap;
use thiserror::Error;

use crate::logic::filter::EntityFilter;
use crate::logic::merge::{is_hidden, merge_entity};
use crate::logic::relationships;
use crate::model::{
    is_valid_identifier, Entity, EntityClass, EntityKey, OverlayRecord, OverlayStatus,
    RelationWarning, ResolvedEntity, TypeRegistry, WarningReason, DELETED_ANNOTATION,
    DELETED_AT_ANNOTATION, ENTITY_KIND,
};
use crate::store::traits::Store;

/// Error taxonomy of the reconciliation layer. The API layer maps each kind
/// to an HTTP status; `Unavailable` keeps the store detail out of its
/// display so nothing internal leaks into response bodies.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("entity {0} not found")]
    NotFound(EntityKey),
    #[error("entity {0} already exists")]
    Conflict(EntityKey),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("write access denied: {0}")]
    Forbidden(String),
    #[error("catalog store unavailable")]
    Unavailable(#[from] anyhow::Error),
}

/// One entity's merged state plus where it came from, used internally to
/// route deletes (soft vs hard) without a second store round-trip.
struct MergedState {
    merged: Entity,
    overlay: Option<OverlayRecord>,
    has_reference: bool,
}

/// The Reconciliation Service: answers every read from the merged view of
/// the two stores and routes every write to the Overlay Store. Stateless;
/// the stores are injected per call.
pub struct Reconciler;

impl Reconciler {
    pub async fn get<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
    ) -> Result<ResolvedEntity, CatalogError> {
        let state = Self::visible(store, types.type_value(class), key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.clone()))?;
        Self::resolve(store, types, state.merged).await
    }

    /// Eagerly computed, deterministically ordered merged listing.
    pub async fn list<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        filter: &EntityFilter,
    ) -> Result<Vec<ResolvedEntity>, CatalogError> {
        let merged = Self::list_merged(store, types.type_value(class)).await?;

        let mut results = Vec::new();
        for state in merged {
            if !filter.matches(&state.merged) {
                continue;
            }
            results.push(Self::resolve(store, types, state.merged).await?);
        }
        Ok(results)
    }

    /// Creates an entity in the Overlay Store. The Reference Store is
    /// externally owned; this path never writes to it.
    pub async fn create<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        body: Entity,
    ) -> Result<ResolvedEntity, CatalogError> {
        let body = Self::validate_body(types, class, body)?;
        let key = body.key();

        // Conflict on any visible entity at this key, whatever its type
        let reference = store.get_reference(&key).await?;
        let overlay = store.get_record(&key).await?;
        if let Some(merged) = merge_entity(reference.as_ref(), overlay.as_ref()) {
            if !is_hidden(&merged, overlay.as_ref()) {
                return Err(CatalogError::Conflict(key));
            }
        }

        info!("creating {} {}", class, key);
        store.upsert_record(OverlayRecord::active(body)).await?;
        Self::get(store, types, class, &key).await
    }

    /// Full-body replacement. Identity fields are immutable; a body that
    /// tries to change them is rejected. Last write wins between
    /// concurrent updates to the same key.
    pub async fn update<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
        body: Entity,
    ) -> Result<ResolvedEntity, CatalogError> {
        let body = Self::validate_body(types, class, body)?;
        if body.key() != *key {
            return Err(CatalogError::InvalidArgument(format!(
                "entity identity is immutable: body is {}, path is {}",
                body.key(),
                key
            )));
        }

        let state = Self::visible(store, types.type_value(class), key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.clone()))?;

        let now = Utc::now();
        let record = OverlayRecord {
            entity: body,
            status: OverlayStatus::Active,
            created_at: state
                .overlay
                .as_ref()
                .map(|r| r.created_at)
                .unwrap_or(now),
            updated_at: now,
        };
        info!("updating {} {}", class, key);
        store.upsert_record(record).await?;
        Self::get(store, types, class, key).await
    }

    /// Soft-deletes reference-backed entities (the declarative source would
    /// resurrect them otherwise) and hard-deletes overlay-only ones.
    /// Deleting a server cascades over the tools whose resolved parent
    /// reference points at it; tools and workloads never cascade.
    pub async fn delete<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
    ) -> Result<(), CatalogError> {
        let state = Self::visible(store, types.type_value(class), key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.clone()))?;

        if class == EntityClass::Server {
            let tools = Self::list_merged(store, types.type_value(EntityClass::Tool)).await?;
            for tool in tools {
                if relationships::references_parent(&tool.merged, key) {
                    debug!("cascade delete of tool {} under server {}", tool.merged.key(), key);
                    Self::delete_one(store, tool).await?;
                }
            }
        }

        info!("deleting {} {}", class, key);
        Self::delete_one(store, state).await
    }

    /// Admin surface: overlay tombstones of the given type, name order.
    pub async fn list_soft_deleted<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
    ) -> Result<Vec<Entity>, CatalogError> {
        let records = store.list_records(types.type_value(class)).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.is_soft_deleted())
            .map(|record| record.entity)
            .sorted_by(|a, b| a.key().to_string().cmp(&b.key().to_string()))
            .collect())
    }

    /// Clears a tombstone so the entity becomes visible again. Idempotent:
    /// undeleting an already-visible entity is a no-op success.
    pub async fn undelete<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
    ) -> Result<(), CatalogError> {
        let mut record = Self::admin_record(store, types, class, key).await?;
        if !record.is_soft_deleted() {
            return Ok(());
        }

        record.status = OverlayStatus::Active;
        record.entity.annotations.remove(DELETED_ANNOTATION);
        record.entity.annotations.remove(DELETED_AT_ANNOTATION);
        record.updated_at = Utc::now();
        info!("undeleting {} {}", class, key);
        store.upsert_record(record).await?;
        Ok(())
    }

    /// Physically removes a tombstone. For a reference-backed entity this
    /// makes it visible again on the next read, since the declarative
    /// source keeps supplying the record.
    pub async fn hard_delete<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
    ) -> Result<(), CatalogError> {
        let record = Self::admin_record(store, types, class, key).await?;
        if !record.is_soft_deleted() {
            return Err(CatalogError::NotFound(key.clone()));
        }
        info!("hard-deleting {} {}", class, key);
        store.delete_record(key).await?;
        Ok(())
    }

    async fn admin_record<S: Store>(
        store: &S,
        types: &TypeRegistry,
        class: EntityClass,
        key: &EntityKey,
    ) -> Result<OverlayRecord, CatalogError> {
        let record = store
            .get_record(key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.clone()))?;
        if record.entity.entity_type != types.type_value(class) {
            return Err(CatalogError::NotFound(key.clone()));
        }
        Ok(record)
    }

    async fn delete_one<S: Store>(store: &S, state: MergedState) -> Result<(), CatalogError> {
        let key = state.merged.key();
        if state.has_reference {
            // Tombstone, not removal: the Reference Store re-supplies this
            // entity on every ingestion cycle.
            let now = Utc::now();
            let mut record = state.overlay.unwrap_or_else(|| OverlayRecord {
                entity: state.merged,
                status: OverlayStatus::Active,
                created_at: now,
                updated_at: now,
            });
            record.status = OverlayStatus::SoftDeleted;
            record
                .entity
                .annotations
                .insert(DELETED_ANNOTATION.to_string(), "true".to_string());
            record
                .entity
                .annotations
                .insert(DELETED_AT_ANNOTATION.to_string(), now.to_rfc3339());
            record.updated_at = now;
            store.upsert_record(record).await?;
        } else {
            store.delete_record(&key).await?;
        }
        Ok(())
    }

    async fn visible<S: Store>(
        store: &S,
        type_value: &str,
        key: &EntityKey,
    ) -> Result<Option<MergedState>, CatalogError> {
        let reference = store.get_reference(key).await?;
        let overlay = store.get_record(key).await?;
        let Some(merged) = merge_entity(reference.as_ref(), overlay.as_ref()) else {
            return Ok(None);
        };
        if merged.entity_type != type_value || is_hidden(&merged, overlay.as_ref()) {
            return Ok(None);
        }
        Ok(Some(MergedState {
            merged,
            overlay,
            has_reference: reference.is_some(),
        }))
    }

    /// Merged, visible entities of one type in deterministic name order.
    async fn list_merged<S: Store>(
        store: &S,
        type_value: &str,
    ) -> Result<Vec<MergedState>, CatalogError> {
        let references = store.list_references(type_value).await?;
        let mut overlay_map: HashMap<EntityKey, OverlayRecord> = store
            .list_records(type_value)
            .await?
            .into_iter()
            .map(|record| (record.entity.key(), record))
            .collect();

        let mut states = Vec::new();
        for reference in references {
            let overlay = overlay_map.remove(&reference.key());
            // merge of (Some, _) is always Some
            let Some(merged) = merge_entity(Some(&reference), overlay.as_ref()) else {
                continue;
            };
            if is_hidden(&merged, overlay.as_ref()) {
                continue;
            }
            states.push(MergedState {
                merged,
                overlay,
                has_reference: true,
            });
        }
        for (_, record) in overlay_map {
            let Some(merged) = merge_entity(None, Some(&record)) else {
                continue;
            };
            if is_hidden(&merged, Some(&record)) {
                continue;
            }
            states.push(MergedState {
                merged,
                overlay: Some(record),
                has_reference: false,
            });
        }

        Ok(states
            .into_iter()
            .sorted_by(|a, b| {
                (&a.merged.namespace, &a.merged.name).cmp(&(&b.merged.namespace, &b.merged.name))
            })
            .collect())
    }

    /// Annotates a merged entity with its resolved relationship references.
    /// Broken and malformed references become warnings, never failures.
    async fn resolve<S: Store>(
        store: &S,
        types: &TypeRegistry,
        entity: Entity,
    ) -> Result<ResolvedEntity, CatalogError> {
        let mut resolved = ResolvedEntity::unresolved(entity);

        match types.class_for_type(&resolved.entity.entity_type) {
            Some(EntityClass::Tool) => {
                if let Some(reference) = relationships::parent_reference(&resolved.entity) {
                    match relationships::parse_target(&resolved.entity, &reference) {
                        Some(target) => {
                            let server_type = types.type_value(EntityClass::Server);
                            if Self::visible(store, server_type, &target).await?.is_some() {
                                resolved.parent = Some(target);
                            } else {
                                resolved.warnings.push(RelationWarning {
                                    field: reference.field.to_string(),
                                    reference: reference.raw,
                                    reason: WarningReason::BrokenReference,
                                });
                            }
                        }
                        None => resolved.warnings.push(RelationWarning {
                            field: reference.field.to_string(),
                            reference: reference.raw,
                            reason: WarningReason::InvalidReference,
                        }),
                    }
                }
            }
            Some(EntityClass::Workload) => {
                let tool_type = types.type_value(EntityClass::Tool).to_string();
                for reference in relationships::dependency_references(&resolved.entity) {
                    match relationships::parse_target(&resolved.entity, &reference) {
                        Some(target) => {
                            if Self::visible(store, &tool_type, &target).await?.is_some() {
                                resolved.depends_on.push(target);
                            } else {
                                resolved.warnings.push(RelationWarning {
                                    field: reference.field.to_string(),
                                    reference: reference.raw,
                                    reason: WarningReason::BrokenReference,
                                });
                            }
                        }
                        None => resolved.warnings.push(RelationWarning {
                            field: reference.field.to_string(),
                            reference: reference.raw,
                            reason: WarningReason::InvalidReference,
                        }),
                    }
                }
            }
            _ => {}
        }

        Ok(resolved)
    }

    fn validate_body(
        types: &TypeRegistry,
        class: EntityClass,
        body: Entity,
    ) -> Result<Entity, CatalogError> {
        if !is_valid_identifier(&body.namespace) || !is_valid_identifier(&body.name) {
            return Err(CatalogError::InvalidArgument(format!(
                "malformed entity key {:?}/{:?}",
                body.namespace, body.name
            )));
        }
        if body.kind != ENTITY_KIND {
            return Err(CatalogError::InvalidArgument(format!(
                "kind must be {ENTITY_KIND:?}"
            )));
        }
        let expected_type = types.type_value(class);
        if body.entity_type != expected_type {
            return Err(CatalogError::InvalidArgument(format!(
                "type must be {:?} on this path, got {:?}",
                expected_type, body.entity_type
            )));
        }
        for reserved in [DELETED_ANNOTATION, DELETED_AT_ANNOTATION] {
            if body.annotations.contains_key(reserved) {
                return Err(CatalogError::InvalidArgument(format!(
                    "annotation {reserved:?} is reserved"
                )));
            }
        }
        Ok(body)
    }
}
