use std::{net::SocketAddr, sync::Arc};

use inkpress::{
    config::Config, repositories::PostgresRepo, routes::create_routes,
    storage::local::LocalObjectStore, AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("inkpress=debug,tower_http=debug")),
        )
        .init();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        error!("Failed to run migrations: {:?}", err);
        std::process::exit(1);
    }

    let store = LocalObjectStore::new(&config.upload_dir, config.public_url.clone());
    let port = config.port;
    let app_state = AppState::new(config, Arc::new(PostgresRepo::new(pool)), Arc::new(store));

    let app = create_routes(Arc::new(app_state));

    let listener = match tokio::net::TcpListener::bind(format!("[::]:{port}")).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind port {port}: {:?}", err);
            std::process::exit(1);
        }
    };
    info!("Listening on port {port}");

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {:?}", err);
    }
}
