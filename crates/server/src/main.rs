//! Suzuno - serve a media directory with thumbnails
//!
//! Usage: `suzuno [ROOT]`. The optional argument overrides the configured
//! media root.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let mut config = ServerConfig::load()?;
    if let Some(root) = std::env::args_os().nth(1) {
        config = config.with_root(root);
    }

    // Start server
    server::start_server(config).await?;

    Ok(())
}
