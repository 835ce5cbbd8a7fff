/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_MARK_READ_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sync-core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat backend
    pub api_base: String,

    /// Id of the signed-in user
    pub local_user: String,

    /// Bearer token for the debug client (production injects a
    /// CredentialProvider instead)
    pub auth_token: Option<String>,

    /// Poll fallback interval for the message feed
    pub poll_interval: Duration,

    /// Delay before an opened conversation is marked read
    pub mark_read_delay: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Use the push channel when the backend offers one
    pub push_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8080".to_string(),
            local_user: String::new(),
            auth_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            mark_read_delay: DEFAULT_MARK_READ_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            push_enabled: true,
        }
    }
}

impl Config {
    /// Create config from command line arguments. Returns the config and
    /// any leftover positional operands (the debug client reads the peer
    /// user id from them).
    pub fn from_args(args: &[String]) -> Result<(Self, Vec<String>)> {
        if args.len() < 2 {
            return Err(ChatError::Config(format!(
                "Usage: {} <api-base> <local-user> [peer-user] [--token <token>] [--poll-interval <secs>] [--mark-read-delay <ms>] [--request-timeout <secs>] [--no-push]",
                args.first().map(String::as_str).unwrap_or("embersync")
            )));
        }

        let mut positionals: Vec<String> = Vec::new();
        let mut auth_token: Option<String> = None;
        let mut poll_interval = DEFAULT_POLL_INTERVAL;
        let mut mark_read_delay = DEFAULT_MARK_READ_DELAY;
        let mut request_timeout = DEFAULT_REQUEST_TIMEOUT;
        let mut push_enabled = true;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--token" => {
                    let t = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--token requires a value".to_string())
                    })?;
                    auth_token = Some(t.clone());
                    i += 2;
                }
                "--poll-interval" => {
                    let secs = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--poll-interval requires a value in seconds".to_string())
                    })?;
                    poll_interval = Duration::from_secs(secs.parse::<u64>().map_err(|_| {
                        ChatError::Config("--poll-interval must be a whole number of seconds".to_string())
                    })?);
                    i += 2;
                }
                "--mark-read-delay" => {
                    let ms = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--mark-read-delay requires a value in milliseconds".to_string())
                    })?;
                    mark_read_delay = Duration::from_millis(ms.parse::<u64>().map_err(|_| {
                        ChatError::Config("--mark-read-delay must be a whole number of milliseconds".to_string())
                    })?);
                    i += 2;
                }
                "--request-timeout" => {
                    let secs = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--request-timeout requires a value in seconds".to_string())
                    })?;
                    request_timeout = Duration::from_secs(secs.parse::<u64>().map_err(|_| {
                        ChatError::Config("--request-timeout must be a whole number of seconds".to_string())
                    })?);
                    i += 2;
                }
                "--no-push" => {
                    push_enabled = false;
                    i += 1;
                }
                other => {
                    positionals.push(other.to_string());
                    i += 1;
                }
            }
        }

        let mut api_base = positionals
            .first()
            .cloned()
            .ok_or_else(|| ChatError::Config("an api base URL is required".to_string()))?;
        let mut local_user = positionals.get(1).cloned().unwrap_or_default();
        let operands: Vec<String> = positionals.into_iter().skip(2).collect();

        // Env overrides (nice for scripts)
        if let Ok(base) = std::env::var("EMBERLINK_API_BASE") {
            api_base = base;
        }
        if let Ok(user) = std::env::var("EMBERLINK_USER") {
            local_user = user;
        }
        if let Ok(token) = std::env::var("EMBERLINK_TOKEN") {
            auth_token = Some(token);
        }
        if let Some(secs) = std::env::var("EMBERLINK_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            poll_interval = Duration::from_secs(secs);
        }
        if std::env::var("EMBERLINK_NO_PUSH").is_ok() {
            push_enabled = false;
        }

        Ok((
            Self {
                api_base,
                local_user,
                auth_token,
                poll_interval,
                mark_read_delay,
                request_timeout,
                push_enabled,
            },
            operands,
        ))
    }
}
