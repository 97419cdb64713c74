// src/main.rs
use poll_service::store::PgStore;
use poll_service::{db, routes, Config, PollService};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poll_service=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads .env first so RUST_LOG can come from there too
    let config = Config::from_env()?;
    init_tracing();

    let pool = db::create_pool(&config).await?;
    let service = PollService::new(PgStore::new(pool));
    let app = routes::create_routes(service);

    info!(addr = %config.bind_addr, "poll service listening");
    axum_server::bind(config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
