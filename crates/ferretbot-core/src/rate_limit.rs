use std::time::{Duration, Instant};

/// Outbound throttling for public chat and private messages.
///
/// Public sends are suppressed when they repeat the last public text or come
/// sooner than `public_interval` after the last unforced send. Forced sends
/// skip both checks; they still become the "last text" but leave the interval
/// timer alone.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    public_interval: Duration,
    private_interval: Duration,
    last_public_text: String,
    last_public_at: Option<Instant>,
    last_private_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new(public_interval: Duration, private_interval: Duration) -> Self {
        Self {
            public_interval,
            private_interval,
            last_public_text: String::new(),
            last_public_at: None,
            last_private_at: None,
        }
    }

    pub fn public_interval(&self) -> Duration {
        self.public_interval
    }

    pub fn set_public_interval(&mut self, interval: Duration) {
        self.public_interval = interval;
    }

    /// Interval-only check, used before starting work whose text is not yet known.
    pub fn public_window_open(&self, now: Instant) -> bool {
        elapsed_at_least(self.last_public_at, now, self.public_interval)
    }

    pub fn can_send_public(&self, text: &str, now: Instant, force: bool) -> bool {
        if force {
            return true;
        }
        if !self.last_public_text.is_empty() && text == self.last_public_text {
            return false;
        }
        self.public_window_open(now)
    }

    pub fn can_send_private(&self, now: Instant) -> bool {
        elapsed_at_least(self.last_private_at, now, self.private_interval)
    }

    pub fn record_public_send(&mut self, text: &str, now: Instant, forced: bool) {
        self.last_public_text = text.to_string();
        if !forced {
            self.last_public_at = Some(now);
        }
    }

    pub fn record_private_send(&mut self, now: Instant) {
        self.last_private_at = Some(now);
    }
}

fn elapsed_at_least(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= interval,
    }
}
