use axum::serve;
use mcp_catalog::api::handlers::AppState;
use mcp_catalog::api::routes::create_router;
use mcp_catalog::config::AppConfig;
use mcp_catalog::seed;
use mcp_catalog::store::{CatalogStore, FileReferenceStore, PostgresOverlayStore};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

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
    log::info!("overlay store ready");

    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        log::info!("loading seed data");
        seed::load_seed_data(&overlay_store).await?;
    }

    let store = CatalogStore::new(reference_store, overlay_store);
    let state = AppState::new(store, config.catalog.types.registry());
    let app = create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("mcp-catalog server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
