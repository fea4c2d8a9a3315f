/// Lower-cased chat nick. All whitelist and administrator checks go through this.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nick(String);

impl Nick {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat line decoded from an inbound `MSG` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub sender: String,
    pub text: String,
}

/// Connection lifecycle and traffic, as surfaced by the transport adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Connected,
    Message(IncomingMessage),
    /// Transport-level ping acknowledgement (a websocket pong).
    Ping,
    Error(String),
    Closed,
}

/// Where a fetched image should be delivered once the lookup resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Public,
    Private { nick: String },
}

/// Result of a spawned image lookup, fed back into the event loop.
#[derive(Clone, Debug)]
pub struct FetchCompletion {
    pub delivery: Delivery,
    pub result: std::result::Result<String, crate::errors::FetchError>,
}
