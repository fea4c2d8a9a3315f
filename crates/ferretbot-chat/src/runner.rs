use std::sync::Arc;

use tracing::{info, warn};

use ferretbot_core::{
    bot::Bot, config::Config, ports::ImageSource, whitelist::Whitelist,
};

use crate::WsChat;

/// Connect to chat and run the bot until the connection task ends.
pub async fn run(cfg: Arc<Config>, images: Arc<dyn ImageSource>) -> anyhow::Result<()> {
    // wss handshakes go through rustls; pin the ring provider for the process.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("a rustls crypto provider was already installed");
    }

    let whitelist = Whitelist::load(&cfg.whitelist_file);
    info!(
        admins = cfg.admins.len(),
        whitelisted = whitelist.len(),
        reconnect = cfg.reconnect,
        "starting ferretbot"
    );

    let (chat, events, connection) = WsChat::connect(&cfg)?;
    let bot = Bot::new(cfg.clone(), whitelist, Arc::new(chat), images);

    bot.run(events).await;

    // The loop only ends after the connection task dropped its event sender.
    connection.await?;
    info!("ferretbot stopped");
    Ok(())
}
