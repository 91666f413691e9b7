//! Client configuration loaded from environment variables.
//!
//! All settings have defaults matching the demo's timings so the client can
//! start with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use parley_shared::constants::{
    COUNTRIES_URL, OTP_SEND_DELAY_MS, OTP_VERIFY_DELAY_MS, PAGE_SIZE, REPLY_BASE_DELAY_MS,
    REPLY_JITTER_MS,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite file holding the snapshot slots.
    /// Env: `PARLEY_DB_PATH`
    /// Default: platform data directory (see `Database::default_path`).
    pub db_path: Option<PathBuf>,

    /// Messages per page.
    /// Env: `PARLEY_PAGE_SIZE`
    /// Default: `20`
    pub page_size: usize,

    /// Fixed part of the simulated reply latency.
    /// Env: `PARLEY_REPLY_BASE_MS`
    /// Default: `2000`
    pub reply_base_delay: Duration,

    /// Upper bound of the random extra reply latency.
    /// Env: `PARLEY_REPLY_JITTER_MS`
    /// Default: `2000`
    pub reply_jitter: Duration,

    /// Simulated OTP delivery latency.
    /// Env: `PARLEY_OTP_SEND_MS`
    /// Default: `1500`
    pub otp_send_delay: Duration,

    /// Simulated OTP verification latency.
    /// Env: `PARLEY_OTP_VERIFY_MS`
    /// Default: `1000`
    pub otp_verify_delay: Duration,

    /// Country list endpoint.
    /// Env: `PARLEY_COUNTRIES_URL`
    pub countries_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            page_size: PAGE_SIZE,
            reply_base_delay: Duration::from_millis(REPLY_BASE_DELAY_MS),
            reply_jitter: Duration::from_millis(REPLY_JITTER_MS),
            otp_send_delay: Duration::from_millis(OTP_SEND_DELAY_MS),
            otp_verify_delay: Duration::from_millis(OTP_VERIFY_DELAY_MS),
            countries_url: COUNTRIES_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("PARLEY_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(val) = std::env::var("PARLEY_PAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.page_size = n,
                _ => tracing::warn!(value = %val, "Invalid PARLEY_PAGE_SIZE, using default"),
            }
        }

        override_millis("PARLEY_REPLY_BASE_MS", &mut config.reply_base_delay);
        override_millis("PARLEY_REPLY_JITTER_MS", &mut config.reply_jitter);
        override_millis("PARLEY_OTP_SEND_MS", &mut config.otp_send_delay);
        override_millis("PARLEY_OTP_VERIFY_MS", &mut config.otp_verify_delay);

        if let Ok(url) = std::env::var("PARLEY_COUNTRIES_URL") {
            if !url.is_empty() {
                config.countries_url = url;
            }
        }

        config
    }

    /// Same configuration with every artificial delay removed.
    pub fn without_delays(mut self) -> Self {
        self.reply_base_delay = Duration::ZERO;
        self.reply_jitter = Duration::ZERO;
        self.otp_send_delay = Duration::ZERO;
        self.otp_verify_delay = Duration::ZERO;
        self
    }
}

fn override_millis(var: &str, target: &mut Duration) {
    if let Ok(val) = std::env::var(var) {
        match parse_millis(&val) {
            Some(d) => *target = d,
            None => tracing::warn!(var, value = %val, "Invalid duration, using default"),
        }
    }
}

/// Parse a non-negative millisecond count.
fn parse_millis(s: &str) -> Option<Duration> {
    s.trim().parse::<u64>().ok().map(Duration::from_millis)
}
