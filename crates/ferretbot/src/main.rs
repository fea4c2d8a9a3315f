use std::sync::Arc;

use ferretbot_api::FerretApiClient;

use ferretbot_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), ferretbot_core::Error> {
    ferretbot_core::logging::init("ferretbot")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(url = %cfg.chat_url, "configuration loaded");

    let images = Arc::new(FerretApiClient::new(
        cfg.ferret_api_url.clone(),
        cfg.fetch_timeout,
    )?);

    ferretbot_chat::runner::run(cfg, images)
        .await
        .map_err(|e| ferretbot_core::Error::External(format!("chat bot failed: {e}")))?;

    Ok(())
}
