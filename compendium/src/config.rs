//! Client configuration.
//!
//! Everything has a default that points at the live compendium, so a config
//! file is optional. When present it lives at
//! `<config_dir>/compendium/config.json` and may set any subset of fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

/// Root of the compendium site all default endpoints hang off.
pub const DEFAULT_SITE_ROOT: &str = "http://www.wizards.com/dndinsider/compendium";

/// Upper bound on back-to-back logins while waiting for a valid session.
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Pause between stylesheet requests so we don't hammer the server.
pub const DEFAULT_CSS_DELAY_MS: u64 = 100;

const APP_DIR: &str = "compendium";
const CONFIG_FILE: &str = "config.json";

/// How the client logs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthStrategy {
    /// POST email and password, keep whatever cookies come back.
    Direct,
    /// Scrape the login page's hidden form fields first, then POST them
    /// along with the credentials.
    #[default]
    TokenForm,
}

impl AuthStrategy {
    /// Cookie names that must be present and unexpired for a session to count.
    pub const fn required_cookies(self) -> &'static [&'static str] {
        match self {
            Self::Direct => &[],
            Self::TokenForm => &["ASP.NET_SessionId", "iPlanetDirectoryPro"],
        }
    }
}

/// Remote URLs the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    /// Detail page; the numeric id goes in the `id` query parameter.
    pub content: String,
    pub search: String,
    /// Absolute base that relative `styles/...` references are rewritten to.
    pub styles_base: String,
    /// Stylesheets combined by the CSS aggregator, in order.
    pub stylesheets: Vec<String>,
}

impl Endpoints {
    /// Build the standard endpoint set under a site root.
    pub fn rooted_at(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        let styles_base = format!("{root}/styles");
        let stylesheets = ["reset.css", "site.css", "detail.css"]
            .iter()
            .map(|name| format!("{styles_base}/{name}"))
            .collect();

        Self {
            login: format!("{root}/login.aspx"),
            content: format!("{root}/monster.aspx"),
            search: format!("{root}/CompendiumSearch.asmx/KeywordSearch"),
            styles_base,
            stylesheets,
        }
    }

    /// Detail URL for a single monster.
    pub fn content_url(&self, id: i32) -> String {
        format!("{}?id={id}", self.content)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::rooted_at(DEFAULT_SITE_ROOT)
    }
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub strategy: AuthStrategy,
    /// Overrides the strategy's required cookie names when set.
    pub required_cookies: Option<Vec<String>>,
    /// Logins tried per fetch before giving up. `0` is treated as `1`.
    pub max_login_attempts: u32,
    pub css_delay_ms: u64,
    /// Where the session blob is kept. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            strategy: AuthStrategy::default(),
            required_cookies: None,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            css_delay_ms: DEFAULT_CSS_DELAY_MS,
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// a file is there and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Cookie names a valid session must carry.
    pub fn required_cookies(&self) -> Vec<String> {
        self.required_cookies.clone().unwrap_or_else(|| {
            self.strategy
                .required_cookies()
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }

    pub const fn css_delay(&self) -> Duration {
        Duration::from_millis(self.css_delay_ms)
    }

    /// Directory holding the session blob.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR)))
    }
}
