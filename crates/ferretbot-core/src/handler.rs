use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    domain::{ChatEvent, Delivery, FetchCompletion, IncomingMessage, Nick},
    ports::{ChatPort, ImageSource},
    rate_limit::RateLimiter,
    whitelist::Whitelist,
};

const TRIGGERS: [&str; 3] = ["!ferret", "!polecat", "! ferretlol"];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Ferret,
    Source,
    Ping,
    PingTest,
    Whitelist(Nick),
    Blacklist(Nick),
    RateLimit(String),
    Uptime,
}

/// Classify a chat line. Matching is done on the trimmed, lower-cased text.
fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim().to_lowercase();
    if TRIGGERS.contains(&text.as_str()) {
        return Some(Command::Ferret);
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    match parts.as_slice() {
        ["!fsource"] => Some(Command::Source),
        ["!ping"] => Some(Command::Ping),
        ["!fping"] => Some(Command::PingTest),
        ["!fuptime"] => Some(Command::Uptime),
        // The whitelist file is comma-separated, so a comma can never be part of a nick.
        ["!fwhitelist", name] if !name.contains(',') => {
            Some(Command::Whitelist(Nick::new(name)))
        }
        ["!fblacklist", name] if !name.contains(',') => {
            Some(Command::Blacklist(Nick::new(name)))
        }
        ["!fratelimit", secs] => Some(Command::RateLimit((*secs).to_string())),
        _ => None,
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

#[derive(Clone, Copy, Debug)]
struct PendingPingTest {
    started_at: Instant,
}

/// Reacts to chat events: authorization, rate limiting and replies.
///
/// Owns all mutable bot state and is driven from a single event loop, so no
/// locking is involved. Image lookups run as spawned tasks and come back via
/// [`CommandHandler::on_fetch_completed`].
pub struct CommandHandler {
    cfg: Arc<Config>,
    chat: Arc<dyn ChatPort>,
    images: Arc<dyn ImageSource>,
    whitelist: Whitelist,
    limiter: RateLimiter,
    pending_ping: Option<PendingPingTest>,
    started_at: Instant,
    completions: mpsc::UnboundedSender<FetchCompletion>,
}

impl CommandHandler {
    pub fn new(
        cfg: Arc<Config>,
        whitelist: Whitelist,
        chat: Arc<dyn ChatPort>,
        images: Arc<dyn ImageSource>,
        completions: mpsc::UnboundedSender<FetchCompletion>,
    ) -> Self {
        let limiter = RateLimiter::new(cfg.public_interval, cfg.private_interval);
        Self {
            cfg,
            chat,
            images,
            whitelist,
            limiter,
            pending_ping: None,
            started_at: Instant::now(),
            completions,
        }
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn ping_pending(&self) -> bool {
        self.pending_ping.is_some()
    }

    pub async fn on_event(&mut self, event: ChatEvent) {
        self.on_event_at(event, Instant::now()).await
    }

    pub async fn on_event_at(&mut self, event: ChatEvent, now: Instant) {
        match event {
            ChatEvent::Connected => info!("connected to chat"),
            ChatEvent::Message(msg) => self.on_message_at(msg, now).await,
            ChatEvent::Ping => self.on_transport_ping_at(now).await,
            ChatEvent::Error(e) => {
                warn!("chat connection error: {e}");
                self.pending_ping = None;
            }
            ChatEvent::Closed => {
                info!("chat connection closed");
                self.pending_ping = None;
            }
        }
    }

    pub async fn on_fetch_completed(&mut self, done: FetchCompletion) {
        self.on_fetch_completed_at(done, Instant::now()).await
    }

    pub async fn on_fetch_completed_at(&mut self, done: FetchCompletion, now: Instant) {
        let url = match done.result {
            Ok(url) => url,
            Err(e) => {
                warn!("ferret lookup failed, skipping reply: {e}");
                return;
            }
        };

        match done.delivery {
            Delivery::Public => {
                self.send_public(&format!("FerretLOL {url} FerretLOL"), now, false)
                    .await;
            }
            Delivery::Private { nick } => {
                if !self.limiter.can_send_private(now) {
                    debug!(%nick, "private reply suppressed by rate limit");
                    return;
                }
                let text = format!("Look like you're not whitelisted, have a pm ferret: {url}");
                match self.chat.send_private(&nick, &text).await {
                    Ok(()) => self.limiter.record_private_send(now),
                    Err(e) => warn!(%nick, "failed to send private message: {e}"),
                }
            }
        }
    }

    async fn on_message_at(&mut self, msg: IncomingMessage, now: Instant) {
        let Some(cmd) = parse_command(&msg.text) else {
            return;
        };
        let nick = Nick::new(&msg.sender);

        match cmd {
            Command::Ferret => return self.request_image(&msg.sender, &nick, now),
            Command::Source => {
                let text = format!("FerretLOL {} FerretLOL", self.cfg.source_url);
                self.send_public(&text, now, false).await;
                return;
            }
            _ => {}
        }

        if !self.cfg.is_admin(&nick) {
            debug!(%nick, "ignoring admin command from non-admin");
            return;
        }

        match cmd {
            Command::PingTest => self.start_ping_test(now).await,
            Command::Whitelist(target) => {
                let text = if self.whitelist.add(target.clone()) {
                    info!(%target, by = %nick, "whitelisted");
                    self.whitelist.persist();
                    format!("{target} whitelisted FerretLOL")
                } else {
                    format!("{target} already whitelisted FerretLOL")
                };
                self.send_public(&text, now, true).await;
            }
            Command::Blacklist(target) => {
                let text = if self.whitelist.remove(&target) {
                    info!(%target, by = %nick, "removed from whitelist");
                    self.whitelist.persist();
                    format!("{target} removed from whitelist FerretLOL")
                } else {
                    format!("{target} not whitelisted FerretLOL")
                };
                self.send_public(&text, now, true).await;
            }
            Command::RateLimit(raw) => match raw.parse::<u64>() {
                Ok(secs) => {
                    info!(secs, by = %nick, "public rate limit changed");
                    self.limiter.set_public_interval(Duration::from_secs(secs));
                }
                Err(_) => debug!(%raw, "ignoring non-numeric rate limit"),
            },
            Command::Uptime => {
                let uptime = format_uptime(now.saturating_duration_since(self.started_at));
                self.send_public(&format!("FerretLOL Uptime: {uptime}"), now, true)
                    .await;
            }
            Command::Ping => {
                self.send_public("FerretLOL", now, true).await;
            }
            Command::Ferret | Command::Source => {}
        }
    }

    fn request_image(&mut self, sender: &str, nick: &Nick, now: Instant) {
        let delivery = if self.whitelist.contains(nick) {
            if !self.limiter.public_window_open(now) {
                debug!(%nick, "public ferret suppressed by rate limit");
                return;
            }
            Delivery::Public
        } else {
            if !self.limiter.can_send_private(now) {
                debug!(%nick, "private ferret suppressed by rate limit");
                return;
            }
            Delivery::Private {
                nick: sender.to_string(),
            }
        };

        let images = self.images.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = images.fetch().await;
            // The loop may already be gone after a disconnect; nothing to do then.
            let _ = completions.send(FetchCompletion { delivery, result });
        });
    }

    async fn start_ping_test(&mut self, now: Instant) {
        self.pending_ping = Some(PendingPingTest { started_at: now });
        if let Err(e) = self.chat.send_ping().await {
            warn!("failed to send transport ping: {e}");
            self.pending_ping = None;
        }
    }

    async fn on_transport_ping_at(&mut self, now: Instant) {
        let Some(test) = self.pending_ping.take() else {
            return;
        };
        let ms = now.saturating_duration_since(test.started_at).as_millis();
        self.send_public(&format!("FerretLOL Ping: {ms}ms"), now, true)
            .await;
    }

    async fn send_public(&mut self, text: &str, now: Instant, force: bool) -> bool {
        if !self.limiter.can_send_public(text, now, force) {
            debug!(%text, "public message suppressed by rate limit");
            return false;
        }
        match self.chat.send_public(text).await {
            Ok(()) => {
                self.limiter.record_public_send(text, now, force);
                true
            }
            Err(e) => {
                warn!("failed to send public message: {e}");
                false
            }
        }
    }
}
