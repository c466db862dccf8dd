// --- IKOS patch desk - Archivo principal ---

use patchdesk::{run_server, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // .env antes del subscriber para que RUST_LOG se respete
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("patchdesk=info,actix_web=info")))
        .init();

    tracing::info!("=== IKOS patch desk (API) ===");
    let config = Config::from_env();
    run_server(config).await
}
