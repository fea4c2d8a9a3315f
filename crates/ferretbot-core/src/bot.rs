use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::{
    config::Config,
    domain::{ChatEvent, FetchCompletion},
    handler::CommandHandler,
    ports::{ChatPort, ImageSource},
    whitelist::Whitelist,
};

/// The bot event loop: one [`CommandHandler`] fed by transport events and
/// completed image lookups, processed strictly one at a time.
pub struct Bot {
    handler: CommandHandler,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
}

impl Bot {
    pub fn new(
        cfg: Arc<Config>,
        whitelist: Whitelist,
        chat: Arc<dyn ChatPort>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handler: CommandHandler::new(cfg, whitelist, chat, images, tx),
            completions: rx,
        }
    }

    /// Run until the transport stops producing events.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ChatEvent>) {
        let Bot {
            mut handler,
            mut completions,
        } = self;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => handler.on_event(event).await,
                    None => {
                        info!("chat event stream ended");
                        break;
                    }
                },
                Some(done) = completions.recv() => handler.on_fetch_completed(done).await,
            }
        }
    }
}
