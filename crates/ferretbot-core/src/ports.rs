use async_trait::async_trait;

use crate::{errors::FetchError, Result};

/// Outbound side of the chat connection.
///
/// The websocket adapter is the production implementation; the handler only
/// ever talks to this trait.
#[async_trait]
pub trait ChatPort: Send + Sync {
    async fn send_public(&self, text: &str) -> Result<()>;
    async fn send_private(&self, nick: &str, text: &str) -> Result<()>;

    /// Send a transport-level ping. The acknowledgement arrives as `ChatEvent::Ping`.
    async fn send_ping(&self) -> Result<()>;
}

/// Source of image URLs (the remote ferret API in production).
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self) -> std::result::Result<String, FetchError>;
}
