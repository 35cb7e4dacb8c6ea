use anyhow::Context;
use docqa::completion::OpenAiCompletionClient;
use docqa::config::{AppConfig, Secrets};
use docqa::{http_server, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // A missing key is fatal
    let secrets = Secrets::load(&config.secrets_path)
        .with_context(|| format!("Failed to load API key from {:?}", config.secrets_path))?;

    let client = OpenAiCompletionClient::new(
        secrets.api_key,
        &config.api_base_url,
        config.engine.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {:?}", config.listen_addr))?;

    let state = AppState::new(config, Arc::new(client)).context("Failed to load page templates")?;

    http_server::start_server(state, addr).await
}
