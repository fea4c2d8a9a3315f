use std::{env, path::PathBuf, time::Duration};

use crate::{domain::Nick, errors::Error, Result};

pub const DEFAULT_CHAT_URL: &str = "wss://www.destiny.gg/ws";
pub const DEFAULT_FERRET_API_URL: &str = "https://polecat.me/api/ferret";
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/voloshink/FerretBot";

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    // Chat
    pub chat_url: String,
    pub auth_token: String,
    pub reconnect: bool,
    pub reconnect_delay: Duration,
    /// Watchdog ping interval; `None` disables the keepalive.
    pub keepalive: Option<Duration>,

    // Access
    pub admins: Vec<Nick>,
    pub whitelist_file: PathBuf,

    // Image API
    pub ferret_api_url: String,
    pub fetch_timeout: Duration,

    // Rate limiting
    pub public_interval: Duration,
    pub private_interval: Duration,

    pub source_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing environment always wins over `.env`.
        let _ = dotenvy::dotenv();

        let auth_token = env_str("DGG_AUTH_TOKEN").unwrap_or_default();
        if auth_token.trim().is_empty() {
            return Err(Error::Config(
                "DGG_AUTH_TOKEN environment variable is required".to_string(),
            ));
        }

        let chat_url = env_str("CHAT_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
        let reconnect = env_bool("CHAT_RECONNECT").unwrap_or(false);
        let reconnect_delay =
            Duration::from_secs(env_u64("CHAT_RECONNECT_DELAY_SECS").unwrap_or(5));
        let keepalive = env_u64("CHAT_KEEPALIVE_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let admins = parse_csv_nicks(env_str("FERRET_ADMINS"));
        let whitelist_file = PathBuf::from(
            env_str("WHITELIST_FILE")
                .and_then(non_empty)
                .unwrap_or_else(|| "whitelist.txt".to_string()),
        );

        let ferret_api_url = env_str("FERRET_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_FERRET_API_URL.to_string());
        let fetch_timeout = Duration::from_millis(env_u64("FETCH_TIMEOUT_MS").unwrap_or(10_000));

        let public_interval = Duration::from_secs(env_u64("PUBLIC_INTERVAL_SECS").unwrap_or(60));
        let private_interval =
            Duration::from_secs(env_u64("PRIVATE_INTERVAL_SECS").unwrap_or(30));

        let source_url = env_str("SOURCE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());

        Ok(Self {
            chat_url,
            auth_token,
            reconnect,
            reconnect_delay,
            keepalive,
            admins,
            whitelist_file,
            ferret_api_url,
            fetch_timeout,
            public_interval,
            private_interval,
            source_url,
        })
    }

    pub fn is_admin(&self, nick: &Nick) -> bool {
        self.admins.contains(nick)
    }

    /// Value of the `Cookie` header sent with the websocket handshake.
    pub fn auth_cookie(&self) -> String {
        format!("authtoken={};", self.auth_token.trim())
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_nicks(v: Option<String>) -> Vec<Nick> {
    let mut out: Vec<Nick> = Vec::new();
    for nick in v
        .unwrap_or_default()
        .split(',')
        .map(Nick::new)
        .filter(|n| !n.as_str().is_empty())
    {
        if !out.contains(&nick) {
            out.push(nick);
        }
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
