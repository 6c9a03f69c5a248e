use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::model::{Entity, EntityKey, OverlayRecord, OverlayStatus};
use crate::store::traits::OverlayStore;

/// PostgreSQL-backed Overlay Store: one JSONB row per entity key. Single-row
/// upsert/delete is the only atomicity the reconciliation layer relies on.
#[derive(Debug, Clone)]
pub struct PostgresOverlayStore {
    pool: PgPool,
}

impl PostgresOverlayStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Creates the overlay table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS overlay_records (
                namespace    TEXT NOT NULL,
                name         TEXT NOT NULL,
                entity_type  TEXT NOT NULL,
                status       TEXT NOT NULL,
                entity       JSONB NOT NULL,
                created_at   TIMESTAMPTZ NOT NULL,
                updated_at   TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (namespace, name)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create overlay_records table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS overlay_records_type_idx ON overlay_records (entity_type)",
        )
        .execute(&self.pool)
        .await
        .context("failed to create overlay_records type index")?;

        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<OverlayRecord> {
    let status_raw: String = row.get("status");
    let status = OverlayStatus::parse(&status_raw)
        .with_context(|| format!("unknown overlay status {status_raw:?}"))?;
    let entity_json: serde_json::Value = row.get("entity");
    let entity: Entity =
        serde_json::from_value(entity_json).context("failed to decode overlay entity body")?;
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(OverlayRecord {
        entity,
        status,
        created_at,
        updated_at,
    })
}

#[async_trait::async_trait]
impl OverlayStore for PostgresOverlayStore {
    async fn get_record(&self, key: &EntityKey) -> Result<Option<OverlayRecord>> {
        let row = sqlx::query(
            "SELECT status, entity, created_at, updated_at
             FROM overlay_records WHERE namespace = $1 AND name = $2",
        )
        .bind(&key.namespace)
        .bind(&key.name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch overlay record")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(record_from_row(&row)?))
    }

    async fn list_records(&self, entity_type: &str) -> Result<Vec<OverlayRecord>> {
        let rows = sqlx::query(
            "SELECT status, entity, created_at, updated_at
             FROM overlay_records WHERE entity_type = $1
             ORDER BY namespace, name",
        )
        .bind(entity_type)
        .fetch_all(&self.pool)
        .await
        .context("failed to list overlay records")?;

        rows.iter().map(record_from_row).collect()
    }

    async fn upsert_record(&self, record: OverlayRecord) -> Result<()> {
        let entity_json =
            serde_json::to_value(&record.entity).context("failed to encode overlay entity body")?;

        sqlx::query(
            r#"
            INSERT INTO overlay_records
                (namespace, name, entity_type, status, entity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (namespace, name) DO UPDATE SET
                entity_type = EXCLUDED.entity_type,
                status = EXCLUDED.status,
                entity = EXCLUDED.entity,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.entity.namespace)
        .bind(&record.entity.name)
        .bind(&record.entity.entity_type)
        .bind(record.status.as_str())
        .bind(entity_json)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to upsert overlay record")?;

        Ok(())
    }

    async fn delete_record(&self, key: &EntityKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM overlay_records WHERE namespace = $1 AND name = $2")
            .bind(&key.namespace)
            .bind(&key.name)
            .execute(&self.pool)
            .await
            .context("failed to delete overlay record")?;

        Ok(result.rows_affected() > 0)
    }
}
