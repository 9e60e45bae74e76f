use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::Error;
use crate::store::{get_option, set_option, OptionStore};
use crate::summarize::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Most changelog sources that may be active at once.
pub const MAX_SOURCE_URLS: usize = 2;

const URLS_KEY: &str = "changelog_urls";
const API_KEY_KEY: &str = "gemini_api_key";
const EMAIL_KEY: &str = "notification_email";

fn env_flag(name: &str, default: bool) -> bool {
    match dotenv::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_opt(name: &str) -> Option<String> {
    dotenv::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Process-level configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub admin_token: String,
    pub admin_email: String,
    pub smtp: Option<SmtpConfig>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub accept_invalid_certs: bool,
    pub debug: bool,
    /// Written into the option store only when it holds nothing yet.
    pub seed: Settings,
}

impl AppConfig {
    /// `DATA_DIR=:memory:` keeps everything in process.
    pub fn in_memory(&self) -> bool {
        self.data_dir.as_os_str() == ":memory:"
    }

    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(
            dotenv::var("DATA_DIR").unwrap_or_else(|_| "./data/checker".to_string()),
        );
        let bind_addr = dotenv::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let admin_token = env_opt("ADMIN_TOKEN").context("ADMIN_TOKEN required")?;
        let admin_email = env_opt("ADMIN_EMAIL").unwrap_or_default();

        let smtp = match env_opt("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: dotenv::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(587),
                username: env_opt("SMTP_USERNAME"),
                password: env_opt("SMTP_PASSWORD"),
            }),
            None => None,
        };

        let seed = Settings {
            urls: sanitize_urls(
                dotenv::var("CHANGELOG_URLS")
                    .unwrap_or_default()
                    .split(',')
                    .map(str::to_string),
            ),
            api_key: env_opt("GEMINI_API_KEY").unwrap_or_default(),
            notification_email: env_opt("NOTIFICATION_EMAIL").unwrap_or_default(),
        };

        Ok(Self {
            data_dir,
            bind_addr,
            admin_token,
            admin_email,
            smtp,
            gemini_base_url: env_opt("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            gemini_model: env_opt("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            accept_invalid_certs: env_flag("FETCH_ACCEPT_INVALID_CERTS", true),
            debug: env_flag("CHECKER_DEBUG", false),
            seed,
        })
    }
}

/// Trim, cap at `MAX_SOURCE_URLS`, and drop anything that isn't an absolute
/// http(s) URL.
pub fn sanitize_urls<I>(input: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    input
        .into_iter()
        .take(MAX_SOURCE_URLS)
        .filter_map(|raw| {
            let parsed = Url::parse(raw.as_ref().trim()).ok()?;
            matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
        })
        .collect()
}

/// Administrator-editable settings kept in the option store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub urls: Vec<String>,
    pub api_key: String,
    pub notification_email: String,
}

impl Settings {
    pub async fn load(store: &dyn OptionStore) -> Result<Self, Error> {
        Ok(Self {
            urls: get_option(store, URLS_KEY).await?.unwrap_or_default(),
            api_key: get_option(store, API_KEY_KEY).await?.unwrap_or_default(),
            notification_email: get_option(store, EMAIL_KEY).await?.unwrap_or_default(),
        })
    }

    pub async fn save(&self, store: &dyn OptionStore) -> Result<(), Error> {
        set_option(store, URLS_KEY, &self.urls).await?;
        set_option(store, API_KEY_KEY, &self.api_key).await?;
        set_option(store, EMAIL_KEY, &self.notification_email).await
    }

    /// Fill in whatever the store is missing from `seed`.
    pub async fn seed(store: &dyn OptionStore, seed: &Settings) -> Result<(), Error> {
        let mut current = Self::load(store).await?;
        let mut changed = false;
        if current.urls.is_empty() && !seed.urls.is_empty() {
            current.urls = seed.urls.clone();
            changed = true;
        }
        if current.api_key.is_empty() && !seed.api_key.is_empty() {
            current.api_key = seed.api_key.clone();
            changed = true;
        }
        if current.notification_email.is_empty() && !seed.notification_email.is_empty() {
            current.notification_email = seed.notification_email.clone();
            changed = true;
        }
        if changed {
            current.save(store).await?;
            info!(urls = current.urls.len(), "settings seeded from environment");
        }
        Ok(())
    }

    /// Where digests go: the configured address, else the admin's.
    pub fn recipient<'a>(&'a self, admin_email: &'a str) -> &'a str {
        if self.notification_email.is_empty() {
            admin_email
        } else {
            &self.notification_email
        }
    }

    pub fn active_urls(&self) -> &[String] {
        &self.urls[..self.urls.len().min(MAX_SOURCE_URLS)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn sanitize_trims_caps_and_drops_invalid() {
        let urls = sanitize_urls([" https://a.example/log ", "ftp://b.example", "https://c.example"]);
        assert_eq!(urls, vec!["https://a.example/log".to_string()]);

        let urls = sanitize_urls(["https://a.example", "not a url", "https://c.example"]);
        assert_eq!(urls, vec!["https://a.example/".to_string()]);

        let urls = sanitize_urls(["", "https://b.example/x"]);
        assert_eq!(urls, vec!["https://b.example/x".to_string()]);
    }

    #[test]
    fn recipient_falls_back_to_admin() {
        let mut settings = Settings::default();
        assert_eq!(settings.recipient("admin@example.com"), "admin@example.com");
        settings.notification_email = "ops@example.com".into();
        assert_eq!(settings.recipient("admin@example.com"), "ops@example.com");
    }

    #[tokio::test]
    async fn seed_only_fills_missing_values() {
        let store = MemoryStore::new();
        Settings {
            api_key: "stored".into(),
            ..Default::default()
        }
        .save(&store)
        .await
        .unwrap();

        let seed = Settings {
            urls: vec!["https://a.example/".into()],
            api_key: "from-env".into(),
            notification_email: "ops@example.com".into(),
        };
        Settings::seed(&store, &seed).await.unwrap();

        let loaded = Settings::load(&store).await.unwrap();
        assert_eq!(loaded.api_key, "stored");
        assert_eq!(loaded.urls, seed.urls);
        assert_eq!(loaded.notification_email, "ops@example.com");
    }
}
