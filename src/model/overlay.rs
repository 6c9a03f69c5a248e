use crate::model::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility tag on an overlay record. Soft-deleted rows stay in the store
/// so the declarative source cannot resurrect the entity on re-ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayStatus {
    Active,
    SoftDeleted,
}

impl OverlayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayStatus::Active => "active",
            OverlayStatus::SoftDeleted => "soft_deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(OverlayStatus::Active),
            "soft_deleted" => Some(OverlayStatus::SoftDeleted),
            _ => None,
        }
    }
}

/// One row in the Overlay Store: the mutable override body for an entity
/// key, plus its visibility tag and audit timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRecord {
    pub entity: Entity,
    pub status: OverlayStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OverlayRecord {
    pub fn active(entity: Entity) -> Self {
        let now = Utc::now();
        Self {
            entity,
            status: OverlayStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.status == OverlayStatus::SoftDeleted
    }
}
