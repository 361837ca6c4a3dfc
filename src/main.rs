//! rolecrate server: admin API for users, roles and permissions.

use std::net::SocketAddr;

use rolecrate::{AppState, Config, build_app, migration::Migrator, seed::seed};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolecrate=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "starting rolecrate");

    let db = Database::connect(&config.database_url).await?;
    if config.auto_migrate {
        Migrator::up(&db, None).await?;
        seed(&db).await?;
    }

    let bind_addr = config.bind_addr.clone();
    let app = build_app(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {bind_addr}");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
