//! Configuration
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// tacstore - headless TAK sync client.
///
/// Keeps an item store in sync with a backend over REST and WebSocket and
/// logs the diff every apply produces.
#[derive(Parser, Debug, Clone)]
#[command(name = "tacstore")]
#[command(about = "Headless TAK sync client - item reconciliation over REST and WebSocket")]
pub struct Args {
    /// Base URL of the backend
    #[arg(long, env = "TAC_SERVER_URL", default_value = "http://localhost:8080")]
    pub server_url: String,

    /// WebSocket URL override; derived from the server URL when absent
    #[arg(long, env = "TAC_WS_URL")]
    pub ws_url: Option<String>,

    /// Polling interval in seconds while the push channel is down
    #[arg(long, env = "TAC_POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: u64,

    /// Consecutive failed WebSocket connects before falling back to polling
    #[arg(long, env = "TAC_WS_MAX_RETRIES", default_value = "5")]
    pub ws_max_retries: u32,

    /// Base WebSocket reconnect backoff in milliseconds
    #[arg(long, env = "TAC_WS_BACKOFF_MS", default_value = "3000")]
    pub ws_backoff_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate the configuration before startup.
    pub fn validate(&self) -> Result<(), String> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(format!(
                "server url must be http(s), got: {}",
                self.server_url
            ));
        }
        if let Some(ws) = &self.ws_url {
            if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
                return Err(format!("websocket url must be ws(s), got: {ws}"));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err("poll interval must be positive".to_string());
        }
        Ok(())
    }

    /// Effective WebSocket endpoint: the explicit override if set,
    /// otherwise the server URL with http(s) swapped for ws(s) plus `/ws`.
    pub fn effective_ws_url(&self) -> String {
        if let Some(ws) = &self.ws_url {
            return ws.clone();
        }
        let base = self.server_url.trim_end_matches('/');
        let swapped = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{swapped}/ws")
    }
}
