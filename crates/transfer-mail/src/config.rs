//! Mail configuration from environment variables.

use std::env;

/// Default sender address.
pub const DEFAULT_FROM: &str = "no-reply@virginia.edu";

/// Default SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// SMTP and notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// SMTP relay host; `None` falls back to dev mode.
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Log messages instead of sending them.
    pub dev_mode: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            from: DEFAULT_FROM.to_string(),
            dev_mode: false,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl MailConfig {
    /// Read `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASS`, `SMTP_FROM`
    /// and `SMTP_DEV_MODE`. Dev mode is forced on when no host is set.
    pub fn from_env() -> Self {
        let host = non_empty("SMTP_HOST");
        let dev_mode = env::var("SMTP_DEV_MODE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            dev_mode: dev_mode || host.is_none(),
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            username: non_empty("SMTP_USER"),
            password: non_empty("SMTP_PASS"),
            from: non_empty("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MailConfig::default();
        assert_eq!(config.port, 25);
        assert_eq!(config.from, "no-reply@virginia.edu");
        assert!(config.host.is_none());
    }
}
