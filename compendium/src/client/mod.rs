//! Session-managed HTTP client for the compendium.
//!
//! The client owns the session outright. Logging in builds a fresh
//! [`Session`] and swaps it in whole; nothing else replaces it except
//! loading from or clearing the store.
//!
//! Typical use:
//!
//! ```rust,no_run
//! use compendium::client::CompendiumClient;
//! use compendium::config::ClientConfig;
//! use compendium::models::Credentials;
//!
//! async fn show(id: i32) -> anyhow::Result<()> {
//!     let mut client = CompendiumClient::new(ClientConfig::default())?
//!         .with_credentials(Credentials::new("dm@example.com", "secret"));
//!     let html = client.fetch_by_id(id).await?.text().await?;
//!     println!("{}", compendium::markup::fix_styles(&html));
//!     Ok(())
//! }
//! ```

mod auth;
mod fetch;
mod request;

#[cfg(test)]
mod testing;

pub use auth::extract_hidden_fields;
pub use request::{Method, RequestDescriptor, ResponseBody};

use chrono::Utc;
use reqwest::redirect::Policy;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ClientError, NetworkError, SessionError};
use crate::models::{Credentials, Session};
use crate::session::{is_valid_at, SessionStore};

const USER_AGENT: &str = concat!("compendium/", env!("CARGO_PKG_VERSION"));

/// Client for one compendium account.
pub struct CompendiumClient {
    config: ClientConfig,
    required_cookies: Vec<String>,
    credentials: Option<Credentials>,
    session: Option<Session>,
    store: Option<SessionStore>,
    /// Follows redirects; used for content, search and the login page.
    http: reqwest::Client,
    /// Never follows redirects, so cookies set on a login redirect are kept.
    login_http: reqwest::Client,
}

impl CompendiumClient {
    /// Create a client with no session and no credentials.
    pub fn new(config: ClientConfig) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(NetworkError::Client)?;
        let login_http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(NetworkError::Client)?;

        Ok(Self {
            required_cookies: config.required_cookies(),
            config,
            credentials: None,
            session: None,
            store: None,
            http,
            login_http,
        })
    }

    /// Use these credentials whenever a login is needed.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Persist sessions to `store` after each login.
    #[must_use]
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session currently held, if any.
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether the held session is usable for `target_url`. Purely local.
    pub fn is_valid(&self, target_url: &str) -> bool {
        is_valid_at(
            self.session.as_ref(),
            target_url,
            &self.required_cookies,
            Utc::now(),
        )
    }

    /// Replace the held session with the stored one. Returns whether a
    /// stored session was found.
    pub fn load_session(&mut self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.load() {
            Some(session) => {
                self.session = Some(session);
                true
            }
            None => false,
        }
    }

    /// Write the held session to the store, if both exist.
    pub fn save_session(&self) {
        if let (Some(store), Some(session)) = (&self.store, &self.session) {
            store.save(session);
        }
    }

    /// Forget the held session and delete the stored one.
    pub fn clear_session(&mut self) {
        self.session = None;
        if let Some(store) = &self.store {
            store.clear();
        }
        info!("session cleared");
    }

    /// Log in until the session is valid for `url`.
    ///
    /// A single login isn't guaranteed to produce a valid session, so this
    /// retries, at most `max_login_attempts` times (never fewer than one).
    /// A login error ends the loop immediately.
    pub async fn ensure_session(&mut self, url: &str) -> Result<(), ClientError> {
        let max_attempts = self.config.max_login_attempts.max(1);
        let mut attempts = 0;
        while !self.is_valid(url) {
            if attempts >= max_attempts {
                return Err(SessionError::LoginExhausted { attempts }.into());
            }
            attempts += 1;
            debug!(attempt = attempts, url, "session invalid, logging in");
            self.login().await?;
        }
        Ok(())
    }

    fn replace_session(&mut self, session: Session) {
        self.session = Some(session);
        self.save_session();
    }
}
