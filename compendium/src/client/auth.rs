//! Logging in.
//!
//! Two strategies, picked by [`AuthStrategy`]:
//! - `Direct` posts the credentials and keeps whatever cookies come back.
//! - `TokenForm` first loads the login page to scrape the ASP.NET hidden
//!   fields (`__VIEWSTATE`, `__EVENTVALIDATION`), then posts them along with
//!   the credentials and the cookies the page set.

use std::collections::HashMap;

use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::request::{capture_cookies, send, RequestDescriptor};
use super::CompendiumClient;
use crate::config::AuthStrategy;
use crate::error::{AuthError, NetworkError};
use crate::models::{Credentials, Session};

const VIEW_STATE: &str = "__VIEWSTATE";
const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
const SIGN_IN_FIELD: &str = "InsiderSignin";
const SIGN_IN_VALUE: &str = "Sign In";

/// Pull the `value` of each named `<input>` out of a page.
///
/// Fails on the first name that has no input, or whose input carries no
/// `value` attribute.
pub fn extract_hidden_fields(
    html: &str,
    names: &[&str],
) -> Result<HashMap<String, String>, AuthError> {
    let document = Html::parse_document(html);
    let mut fields = HashMap::new();

    for &name in names {
        let missing = || AuthError::MissingToken(name.to_string());
        let selector = Selector::parse(&format!(r#"input[name="{name}"]"#)).map_err(|_| missing())?;
        let value = document
            .select(&selector)
            .next()
            .and_then(|input| input.value().attr("value"))
            .ok_or_else(missing)?;
        fields.insert(name.to_string(), value.to_string());
    }

    Ok(fields)
}

fn credential_form(credentials: &Credentials) -> HashMap<String, String> {
    HashMap::from([
        ("email".to_string(), credentials.email.clone()),
        ("password".to_string(), credentials.password.clone()),
    ])
}

impl CompendiumClient {
    /// Log in with the client's credentials.
    pub async fn login(&mut self) -> Result<(), AuthError> {
        let credentials = self.credentials.clone().ok_or(AuthError::NoCredentials)?;
        self.login_with(&credentials).await
    }

    /// Log in with explicit credentials.
    ///
    /// On success the held session is replaced (and persisted when a store
    /// is attached). On failure the previous session is left alone.
    pub async fn login_with(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        let strategy = self.config.strategy;
        info!(?strategy, email = %credentials.email, "logging in");

        let result = match strategy {
            AuthStrategy::Direct => self.login_direct(credentials).await,
            AuthStrategy::TokenForm => self.login_token_form(credentials).await,
        };

        match result {
            Ok(session) => {
                info!(cookies = session.len(), "login complete");
                self.replace_session(session);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    async fn login_direct(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let desc = RequestDescriptor::post(&self.config.endpoints.login, credential_form(credentials));
        let response = send(&self.login_http, &desc, None).await?;

        let mut session = Session::new();
        capture_cookies(&response, &mut session, Utc::now());
        if session.is_empty() {
            return Err(AuthError::Rejected);
        }
        Ok(session)
    }

    async fn login_token_form(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let login_url = &self.config.endpoints.login;
        let mut session = Session::new();

        let page = send(&self.http, &RequestDescriptor::get(login_url), None).await?;
        capture_cookies(&page, &mut session, Utc::now());
        let html = page
            .text()
            .await
            .map_err(|e| NetworkError::transport(login_url, e))?;

        let tokens = extract_hidden_fields(&html, &[VIEW_STATE, EVENT_VALIDATION])?;
        debug!(cookies = session.len(), "scraped login form tokens");

        let mut form = credential_form(credentials);
        form.extend(tokens);
        form.insert(SIGN_IN_FIELD.to_string(), SIGN_IN_VALUE.to_string());

        let desc = RequestDescriptor::post(login_url, form).with_session();
        let response = send(&self.login_http, &desc, Some(&session)).await?;
        capture_cookies(&response, &mut session, Utc::now());

        Ok(session)
    }
}
