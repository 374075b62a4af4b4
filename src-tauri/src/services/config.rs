//! Deployment settings read from `.env`/environment at startup.
//!
//! User preferences (hotkey, window size) live in the config store instead;
//! these are the knobs a packager sets once.

use std::time::Duration;
use url::Url;

pub const DEFAULT_CONTENT_URL: &str = "https://chatgpt.com/";
/// Hosts the default content page hands off to during sign-in.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["chat.openai.com", "auth.openai.com", "auth0.openai.com"];

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 600;
const MIN_UPDATE_INTERVAL_SECS: u64 = 60;
const MAX_UPDATE_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub content_url: Url,
    pub allowed_hosts: Vec<String>,
    /// `None` disables update checks.
    pub update_server: Option<Url>,
    pub update_interval: Duration,
    pub log_level: log::LevelFilter,
}

impl AppSettings {
    /// Reads:
    /// - `OVERLAY_CONTENT_URL`
    /// - `OVERLAY_ALLOWED_HOSTS` (comma separated, replaces the defaults)
    /// - `OVERLAY_UPDATE_SERVER`
    /// - `OVERLAY_UPDATE_INTERVAL_SECS`
    /// - `OVERLAY_LOG`
    pub fn from_env() -> Result<Self, url::ParseError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, url::ParseError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let content_url = match var("OVERLAY_CONTENT_URL")
            .and_then(|raw| parse_web_url("OVERLAY_CONTENT_URL", &raw))
        {
            Some(url) => url,
            None => Url::parse(DEFAULT_CONTENT_URL)?,
        };

        let allowed_hosts = match var("OVERLAY_ALLOWED_HOSTS") {
            Some(raw) => raw
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
        };

        let update_server =
            var("OVERLAY_UPDATE_SERVER").and_then(|raw| parse_web_url("OVERLAY_UPDATE_SERVER", &raw));

        let update_interval_secs = var("OVERLAY_UPDATE_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS)
            .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS);

        let log_level = var("OVERLAY_LOG")
            .and_then(|v| v.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info);

        Ok(Self {
            content_url,
            allowed_hosts,
            update_server,
            update_interval: Duration::from_secs(update_interval_secs),
            log_level,
        })
    }
}

// Logging is not up yet when settings load, so rejections go to stderr.
fn parse_web_url(key: &str, raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            eprintln!("{key}: unsupported scheme '{}', ignoring", url.scheme());
            None
        }
        Err(err) => {
            eprintln!("{key}: {err}, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> AppSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppSettings::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s.content_url.as_str(), DEFAULT_CONTENT_URL);
        assert_eq!(s.allowed_hosts.len(), 3);
        assert!(s.update_server.is_none());
        assert_eq!(s.update_interval, Duration::from_secs(600));
        assert_eq!(s.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("OVERLAY_CONTENT_URL", " https://claude.ai/new "),
            ("OVERLAY_ALLOWED_HOSTS", "Accounts.Example.com, ,sso.example.com"),
            ("OVERLAY_UPDATE_SERVER", "https://updates.example.com"),
            ("OVERLAY_UPDATE_INTERVAL_SECS", "1800"),
            ("OVERLAY_LOG", "debug"),
        ]);
        assert_eq!(s.content_url.as_str(), "https://claude.ai/new");
        assert_eq!(
            s.allowed_hosts,
            vec!["accounts.example.com".to_string(), "sso.example.com".to_string()]
        );
        assert_eq!(
            s.update_server.map(|u| u.to_string()),
            Some("https://updates.example.com/".to_string())
        );
        assert_eq!(s.update_interval, Duration::from_secs(1800));
        assert_eq!(s.log_level, log::LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let s = settings(&[
            ("OVERLAY_CONTENT_URL", "file:///etc/passwd"),
            ("OVERLAY_UPDATE_SERVER", "not a url"),
            ("OVERLAY_UPDATE_INTERVAL_SECS", "soon"),
            ("OVERLAY_LOG", "chatty"),
        ]);
        assert_eq!(s.content_url.as_str(), DEFAULT_CONTENT_URL);
        assert!(s.update_server.is_none());
        assert_eq!(s.update_interval, Duration::from_secs(600));
        assert_eq!(s.log_level, log::LevelFilter::Info);
    }

    #[test]
    fn test_update_interval_is_clamped() {
        assert_eq!(
            settings(&[("OVERLAY_UPDATE_INTERVAL_SECS", "5")]).update_interval,
            Duration::from_secs(60)
        );
        assert_eq!(
            settings(&[("OVERLAY_UPDATE_INTERVAL_SECS", "999999")]).update_interval,
            Duration::from_secs(86_400)
        );
    }
}
