use alumnet::{
    AppState,
    config::Config,
    db,
    retry::{Backoff, retry},
    router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let db_pool = retry(&Backoff::default(), "connect database", || {
        db::connect(&config.database_url, config.db_max_connections)
    })
    .await?;
    db::migrate(&db_pool).await?;

    let app = router(AppState::new(db_pool, config.broadcast_capacity));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
