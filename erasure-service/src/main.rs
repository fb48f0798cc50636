// src/main.rs
use erasure_service::app::{build_scheduler, build_state, create_router, ErasureComponents};
use erasure_service::config::{AppConfig, StoreBackend};
use erasure_service::db::create_db_pool;
use erasure_service::repository::in_memory_marketplace_records::InMemoryMarketplaceRecords;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "erasure_service=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting erasure service...");

    let app_config = AppConfig::from_env()?;
    tracing::info!(
        environment = %app_config.environment,
        store_backend = ?app_config.store_backend,
        grace_period_days = app_config.erasure.grace_period_days,
        "Configuration loaded"
    );

    let components = match app_config.store_backend {
        StoreBackend::Postgres => {
            let db_pool = create_db_pool(&app_config).await?;
            tracing::info!("Database connection established");

            // マイグレーションを適用
            Migrator::up(&db_pool, None).await?;
            tracing::info!("Migrations applied");

            ErasureComponents::postgres(db_pool, &app_config)?
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; requests are lost on restart");
            ErasureComponents::in_memory(Arc::new(InMemoryMarketplaceRecords::new()), &app_config)?
        }
    };

    let server_addr = app_config.server_addr();
    let scheduler_enabled = app_config.erasure.scheduler_enabled;
    let state = build_state(components, Arc::new(app_config));

    if scheduler_enabled {
        build_scheduler(&state).spawn();
    } else {
        tracing::info!("Erasure scheduler disabled");
    }

    let app_router = create_router(state);

    tracing::info!("Server listening on {}", server_addr);
    let listener = TcpListener::bind(&server_addr).await?;
    axum::serve(listener, app_router.into_make_service()).await?;

    Ok(())
}
