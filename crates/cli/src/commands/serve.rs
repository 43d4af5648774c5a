//! `banter serve` — the web chat server.

use banter_config::AppConfig;

pub async fn run(port: Option<u16>) -> banter_core::Result<()> {
    let config = AppConfig::load()?;
    let engine = super::build_engine(&config).await?;

    let port = port.unwrap_or(config.web.port);
    banter_web::serve(&config.web.host, port, engine).await
}
