mod config;
mod database;
mod error;
mod handlers;
mod models;
mod repository;
mod services;
mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::Config;
use database::{create_database_pool, run_migrations};
use handlers::AppState;
use repository::{postgres::PgRepository, Repository};
use services::{
    spawn_status_sweep, storage::PUBLIC_PREFIX, CatalogService, FileStorage, OrderService,
    SweepPolicy,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let pg = PgRepository::new(db);
    let counter = pg.sync_product_sequence().await?;
    log::info!("Product counter at {}", counter);
    let repo: Arc<dyn Repository> = Arc::new(pg);

    let storage = FileStorage::new(&config.upload_dir);
    storage.ensure_layout().await?;
    log::info!("Serving uploads from {}", storage.root().display());

    let orders = OrderService::new(
        repo.clone(),
        SweepPolicy {
            completion_window: config.completion_window,
        },
    );
    spawn_status_sweep(orders.clone(), config.sweep_interval);

    let state = AppState {
        catalog: CatalogService::new(repo.clone(), storage, config.company_prefix.clone()),
        orders,
        repo,
    };
    let app = create_router(state);

    let addr = config.bind_addr();
    log::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.catalog.storage().root());

    Router::new()
        .route("/health", get(handlers::health))
        // Catalog
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        // Orders
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route(
            "/api/orders/:id/status",
            patch(handlers::orders::update_order_status),
        )
        // Inventory
        .route(
            "/api/inventory",
            get(handlers::inventory::list_inventory).post(handlers::inventory::create_inventory),
        )
        // Uploaded images and generated barcodes
        .nest_service(&format!("/{PUBLIC_PREFIX}"), uploads)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // 10MB
        )
        .with_state(state)
}
