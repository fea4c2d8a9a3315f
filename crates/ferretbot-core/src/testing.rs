//! In-memory port implementations shared by the unit tests.

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;

use crate::{
    config::Config,
    domain::Nick,
    errors::{Error, FetchError},
    ports::{ChatPort, ImageSource},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Public(String),
    Private(String, String),
    Ping,
}

#[derive(Default)]
pub struct FakeChat {
    sent: Mutex<Vec<Sent>>,
    fail: AtomicBool,
}

impl FakeChat {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, s: Sent) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection closed".to_string()));
        }
        self.sent.lock().unwrap().push(s);
        Ok(())
    }
}

#[async_trait]
impl ChatPort for FakeChat {
    async fn send_public(&self, text: &str) -> Result<()> {
        self.record(Sent::Public(text.to_string()))
    }

    async fn send_private(&self, nick: &str, text: &str) -> Result<()> {
        self.record(Sent::Private(nick.to_string(), text.to_string()))
    }

    async fn send_ping(&self) -> Result<()> {
        self.record(Sent::Ping)
    }
}

/// Returns queued results first, then `https://img.test/<n>.jpg` for call `n`.
#[derive(Default)]
pub struct FakeImages {
    queued: Mutex<VecDeque<std::result::Result<String, FetchError>>>,
    calls: AtomicUsize,
}

impl FakeImages {
    pub fn push(&self, result: std::result::Result<String, FetchError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for FakeImages {
    async fn fetch(&self) -> std::result::Result<String, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(r) = self.queued.lock().unwrap().pop_front() {
            return r;
        }
        Ok(format!("https://img.test/{n}.jpg"))
    }
}

pub fn tmp_path(prefix: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_nanos();
    let pid = std::process::id();
    PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.txt"))
}

pub fn test_config(public_secs: u64, private_secs: u64) -> Config {
    Config {
        chat_url: "ws://127.0.0.1:1/ws".to_string(),
        auth_token: "x".to_string(),
        reconnect: false,
        reconnect_delay: Duration::from_secs(1),
        keepalive: None,
        admins: vec![Nick::new("Polecat")],
        whitelist_file: tmp_path("ferretbot-whitelist"),
        ferret_api_url: "http://127.0.0.1:1/api/ferret".to_string(),
        fetch_timeout: Duration::from_secs(1),
        public_interval: Duration::from_secs(public_secs),
        private_interval: Duration::from_secs(private_secs),
        source_url: "https://example.test/source".to_string(),
    }
}
