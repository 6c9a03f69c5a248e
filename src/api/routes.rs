use axum::{
    routing::{delete, get},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Maintenance surface: soft-deleted tombstones only
        .route(
            "/admin/soft-deleted/:entity_type",
            get(handlers::list_soft_deleted::<S>),
        )
        .route(
            "/admin/soft-deleted/:entity_type/:namespace/:name",
            delete(handlers::admin_delete::<S>),
        )
        // CRUD over the merged view; the path segment is the configured
        // plural type name (e.g. /servers, /tools, /workloads)
        .route(
            "/:entity_type",
            get(handlers::list_entities::<S>).post(handlers::create_entity::<S>),
        )
        .route(
            "/:entity_type/:namespace/:name",
            get(handlers::get_entity::<S>)
                .put(handlers::update_entity::<S>)
                .delete(handlers::delete_entity::<S>),
        )
}
