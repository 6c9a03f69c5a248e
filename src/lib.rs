pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

pub use api::handlers::AppState;
pub use api::routes;
pub use logic::{CatalogError, EntityFilter, Reconciler};
pub use model::*;
pub use store::{
    CatalogStore, FileReferenceStore, MemoryOverlayStore, MemoryReferenceStore, OverlayStore,
    PostgresOverlayStore, ReferenceStore, Store,
};

/// Wires the production store pair and serves the catalog API. Split out of
/// `main` so integration setups can run the server in-process.
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    dotenvy::dotenv().ok();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = crate::config::AppConfig::load()?;

    let reference_dir = config
        .catalog
        .reference_dir
        .clone()
        .unwrap_or_else(|| "reference".to_string());
    let reference_store = FileReferenceStore::load(reference_dir)?;

    let database_url = config.database_url()?;
    let overlay_store = PostgresOverlayStore::new(
        &database_url,
        config.database.max_connections.unwrap_or(20),
    )
    .await?;
    overlay_store.migrate().await?;

    let store = CatalogStore::new(reference_store, overlay_store);
    let state = AppState::new(store, config.catalog.types.registry());

    let app = routes::create_router().with_state(state);
    let listener = TcpListener::bind(config.server_address()).await?;
    serve(listener, app).await?;

    Ok(())
}
