use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::RoleContext;
use crate::logic::{CatalogError, EntityFilter, Reconciler};
use crate::model::{
    Entity, EntityClass, EntityKey, ResolvedEntity, TypeRegistry, DEFAULT_NAMESPACE,
};
use crate::store::traits::Store;

/// Shared application state: the injected store pair plus the configured
/// type registry.
#[derive(Debug)]
pub struct AppState<S> {
    pub store: Arc<S>,
    pub types: Arc<TypeRegistry>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            types: Arc::clone(&self.types),
        }
    }
}

impl<S> AppState<S> {
    pub fn new(store: S, types: TypeRegistry) -> Self {
        Self {
            store: Arc::new(store),
            types: Arc::new(types),
        }
    }
}

type Rejection = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring match on name/description.
    pub filter: Option<String>,
    /// Tools whose resolved parent is this server reference.
    pub server: Option<String>,
    /// Workloads whose resolved dependencies include this tool reference.
    pub depends_on: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminDeleteQuery {
    pub mode: Option<String>,
}

fn reject(err: CatalogError) -> Rejection {
    let status = match &err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Conflict(_) => StatusCode::CONFLICT,
        CatalogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
        CatalogError::Unavailable(source) => {
            // detail stays server-side; the body only carries the kind
            log::error!("catalog store failure: {source:#}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

fn class_for_segment(types: &TypeRegistry, segment: &str) -> Result<EntityClass, Rejection> {
    types.class_for_segment(segment).ok_or((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(&format!(
            "unknown entity type {segment:?}"
        ))),
    ))
}

fn parse_ref_param(name: &str, raw: &str) -> Result<EntityKey, Rejection> {
    EntityKey::parse(raw, DEFAULT_NAMESPACE).ok_or((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(&format!(
            "invalid {name} reference {raw:?}"
        ))),
    ))
}

fn ensure_can_write(roles: &RoleContext, class: EntityClass) -> Result<(), Rejection> {
    if roles.can_write(class) {
        Ok(())
    } else {
        Err(reject(CatalogError::Forbidden(format!(
            "no write access to {class} entities"
        ))))
    }
}

fn ensure_admin(roles: &RoleContext) -> Result<(), Rejection> {
    if roles.is_admin() {
        Ok(())
    } else {
        Err(reject(CatalogError::Forbidden(
            "maintenance surface requires the admin role".to_string(),
        )))
    }
}

pub async fn list_entities<S: Store>(
    State(state): State<AppState<S>>,
    Path(segment): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<ResolvedEntity>>, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;

    let mut filter = EntityFilter {
        text: query.filter,
        ..Default::default()
    };
    if let Some(raw) = &query.server {
        filter.parent = Some(parse_ref_param("server", raw)?);
    }
    if let Some(raw) = &query.depends_on {
        filter.depends_on = Some(parse_ref_param("depends_on", raw)?);
    }

    let items = Reconciler::list(state.store.as_ref(), &state.types, class, &filter)
        .await
        .map_err(reject)?;
    let total = items.len();
    Ok(Json(ListResponse { items, total }))
}

pub async fn get_entity<S: Store>(
    State(state): State<AppState<S>>,
    Path((segment, namespace, name)): Path<(String, String, String)>,
) -> Result<Json<ResolvedEntity>, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    let key = EntityKey::new(namespace, name);
    let entity = Reconciler::get(state.store.as_ref(), &state.types, class, &key)
        .await
        .map_err(reject)?;
    Ok(Json(entity))
}

pub async fn create_entity<S: Store>(
    State(state): State<AppState<S>>,
    Path(segment): Path<String>,
    roles: RoleContext,
    Json(body): Json<Entity>,
) -> Result<(StatusCode, Json<ResolvedEntity>), Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    ensure_can_write(&roles, class)?;

    let created = Reconciler::create(state.store.as_ref(), &state.types, class, body)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_entity<S: Store>(
    State(state): State<AppState<S>>,
    Path((segment, namespace, name)): Path<(String, String, String)>,
    roles: RoleContext,
    Json(body): Json<Entity>,
) -> Result<Json<ResolvedEntity>, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    ensure_can_write(&roles, class)?;

    let key = EntityKey::new(namespace, name);
    let updated = Reconciler::update(state.store.as_ref(), &state.types, class, &key, body)
        .await
        .map_err(reject)?;
    Ok(Json(updated))
}

pub async fn delete_entity<S: Store>(
    State(state): State<AppState<S>>,
    Path((segment, namespace, name)): Path<(String, String, String)>,
    roles: RoleContext,
) -> Result<StatusCode, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    ensure_can_write(&roles, class)?;

    let key = EntityKey::new(namespace, name);
    Reconciler::delete(state.store.as_ref(), &state.types, class, &key)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_soft_deleted<S: Store>(
    State(state): State<AppState<S>>,
    Path(segment): Path<String>,
    roles: RoleContext,
) -> Result<Json<ListResponse<Entity>>, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    ensure_admin(&roles)?;

    let items = Reconciler::list_soft_deleted(state.store.as_ref(), &state.types, class)
        .await
        .map_err(reject)?;
    let total = items.len();
    Ok(Json(ListResponse { items, total }))
}

pub async fn admin_delete<S: Store>(
    State(state): State<AppState<S>>,
    Path((segment, namespace, name)): Path<(String, String, String)>,
    Query(query): Query<AdminDeleteQuery>,
    roles: RoleContext,
) -> Result<StatusCode, Rejection> {
    let class = class_for_segment(&state.types, &segment)?;
    ensure_admin(&roles)?;

    let key = EntityKey::new(namespace, name);
    match query.mode.as_deref() {
        Some("undelete") => {
            Reconciler::undelete(state.store.as_ref(), &state.types, class, &key)
                .await
                .map_err(reject)?;
        }
        Some("hard-delete") => {
            Reconciler::hard_delete(state.store.as_ref(), &state.types, class, &key)
                .await
                .map_err(reject)?;
        }
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(&format!(
                    "mode must be \"undelete\" or \"hard-delete\", got {other:?}"
                ))),
            ));
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
