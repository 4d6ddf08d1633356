mod auth;
mod config;
mod handlers;
mod models;
#[cfg(test)]
mod test_support;

use crate::config::AppConfig;
use crate::handlers::AppContext;
use aweblog_core::serve;
use aweblog_data::Db;
use aweblog_data_sqlx::SqlxExecutor;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load(Path::new("config.yml"), Path::new("config_override.yml"))?;
    let executor = SqlxExecutor::connect(&config.db).await?;
    let db: Db = Arc::new(executor);
    let ctx = Arc::new(AppContext {
        db,
        session: config.session.clone(),
    });

    let routes = handlers::routes(ctx)?;
    let app = serve::into_router(routes).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server started");
    axum::serve(listener, app).await?;
    Ok(())
}
