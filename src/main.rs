use std::env;
use std::sync::Arc;

use log::info;

use hookjar::endpoint;
use hookjar::{Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let config = Config::from_args()?;
    let store = SqliteStore::open(&config.database)?;
    let (addr, server) = endpoint::bind(&config.addr(), Arc::new(store))?;
    info!("Listening on http://{}{}", addr, endpoint::CAPTURE_PREFIX);
    server.await?;
    Ok(())
}
