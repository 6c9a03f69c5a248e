use crate::model::{Entity, OverlayRecord};

/// Merges a reference record with an overlay record into the entity a
/// reader sees. Pure; store I/O stays in the reconcile layer.
///
/// Precedence rules:
/// - identity fields (`kind`, `type`, `namespace`, `name`) always come from
///   the reference record when one exists, even against a malformed overlay
/// - annotations and labels are unioned, overlay winning on key collisions
/// - `description`, `relations` and the whole `spec` payload are
///   user-editable overlay-wins fields: a populated overlay value replaces
///   the reference value wholesale
pub fn merge_entity(reference: Option<&Entity>, overlay: Option<&OverlayRecord>) -> Option<Entity> {
    match (reference, overlay) {
        (None, None) => None,
        (Some(reference), None) => Some(reference.clone()),
        (None, Some(overlay)) => Some(overlay.entity.clone()),
        (Some(reference), Some(overlay)) => {
            let mut merged = reference.clone();
            let override_body = &overlay.entity;

            for (key, value) in &override_body.annotations {
                merged.annotations.insert(key.clone(), value.clone());
            }
            for (key, value) in &override_body.labels {
                merged.labels.insert(key.clone(), value.clone());
            }
            if override_body.description.is_some() {
                merged.description = override_body.description.clone();
            }
            if !override_body.relations.is_empty() {
                merged.relations = override_body.relations.clone();
            }
            if !override_body.spec.is_empty() {
                merged.spec = override_body.spec.clone();
            }

            Some(merged)
        }
    }
}

/// Soft-delete filter applied uniformly by `get` and `list`: hidden when
/// the overlay record is tagged deleted or the merged body carries the
/// marker annotation.
pub fn is_hidden(merged: &Entity, overlay: Option<&OverlayRecord>) -> bool {
    overlay.map(|record| record.is_soft_deleted()).unwrap_or(false) || merged.is_soft_deleted()
}
