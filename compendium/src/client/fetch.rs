//! Fetching content, searching, and combining stylesheets.

use chrono::Utc;
use tracing::{debug, info};

use super::request::{capture_cookies, send, RequestDescriptor, ResponseBody};
use super::CompendiumClient;
use crate::error::{ClientError, NetworkError, SessionError};
use crate::markup::DETAIL_WIDTH_RULE;
use crate::models::{parse_search_results, SearchResultRow};

impl CompendiumClient {
    /// Fetch a monster's detail page, logging in first if needed.
    pub async fn fetch_by_id(&mut self, id: i32) -> Result<ResponseBody, ClientError> {
        let url = self.config.endpoints.content_url(id);
        self.fetch_url(&url).await
    }

    /// Fetch any compendium page with the session attached, logging in first
    /// if the session isn't valid for `url`.
    pub async fn fetch_url(&mut self, url: &str) -> Result<ResponseBody, ClientError> {
        self.ensure_session(url).await?;

        let desc = RequestDescriptor::content(url);
        let response = send(&self.http, &desc, self.session.as_ref()).await?;
        self.refresh_cookies(&response);
        Ok(ResponseBody::new(response))
    }

    /// Run a monster keyword search. Needs an already valid session; this
    /// never logs in.
    pub async fn search(&mut self, keyword: &str) -> Result<ResponseBody, ClientError> {
        let endpoint = self.config.endpoints.search.clone();
        if !self.is_valid(&endpoint) {
            return Err(SessionError::NotAuthenticated.into());
        }

        debug!(keyword, "searching monsters");
        let desc = RequestDescriptor::search(endpoint, keyword);
        let response = send(&self.http, &desc, self.session.as_ref()).await?;
        self.refresh_cookies(&response);
        Ok(ResponseBody::new(response))
    }

    /// Search and parse the results into rows sorted by level, then name.
    pub async fn search_rows(&mut self, keyword: &str) -> Result<Vec<SearchResultRow>, ClientError> {
        let xml = self.search(keyword).await?.text().await?;
        let rows = parse_search_results(&xml)?;
        info!(keyword, results = rows.len(), "search complete");
        Ok(rows)
    }

    /// Fetch the detail stylesheets one at a time and join them, followed by
    /// the width override.
    pub async fn combined_detail_css(&self) -> Result<String, NetworkError> {
        let mut css = String::new();
        let delay = self.config.css_delay();

        for url in &self.config.endpoints.stylesheets {
            let response = send(&self.http, &RequestDescriptor::get(url), None).await?;
            let body = ResponseBody::new(response).text().await?;
            css.push_str(&body);
            css.push('\n');

            tokio::time::sleep(delay).await;
        }

        css.push_str(DETAIL_WIDTH_RULE);
        css.push('\n');
        Ok(css)
    }

    /// Fold cookies set on an ordinary response into the session, swapping
    /// in an updated copy.
    fn refresh_cookies(&mut self, response: &reqwest::Response) {
        let Some(current) = &self.session else {
            return;
        };
        let mut updated = current.clone();
        if capture_cookies(response, &mut updated, Utc::now()) > 0 {
            self.replace_session(updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{spawn_fake, Behavior};
    use super::*;
    use crate::error::AuthError;
    use crate::markup::fix_styles_with_base;

    #[tokio::test]
    async fn fetch_logs_in_once_then_gets() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());

        let html = client.fetch_by_id(7).await.unwrap().text().await.unwrap();

        assert!(html.contains("Monster 7"));
        assert_eq!(fake.hits.login_posts(), 1);
        assert_eq!(fake.hits.content(), 1);
        let cookie = fake.last_content_cookie().unwrap();
        assert!(cookie.contains("ASP.NET_SessionId=sess-1"));
        assert!(cookie.contains("iPlanetDirectoryPro=tok-1"));

        // Session is still valid, so a second fetch skips the login.
        client.fetch_by_id(8).await.unwrap();
        assert_eq!(fake.hits.login_posts(), 1);
        assert_eq!(fake.hits.content(), 2);
    }

    #[tokio::test]
    async fn fetch_stops_when_login_fails() {
        let fake = spawn_fake(Behavior {
            omit_tokens: true,
            ..Behavior::default()
        })
        .await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());

        let err = client.fetch_by_id(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::MissingToken(_))));
        assert_eq!(fake.hits.login_pages(), 1);
        assert_eq!(fake.hits.content(), 0);
    }

    #[tokio::test]
    async fn fetch_gives_up_after_bounded_logins() {
        let fake = spawn_fake(Behavior {
            expired_identity: true,
            ..Behavior::default()
        })
        .await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());

        let err = client.fetch_by_id(1).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Session(SessionError::LoginExhausted { attempts: 3 })
        ));
        assert_eq!(fake.hits.login_posts(), 3);
        assert_eq!(fake.hits.content(), 0);
    }

    #[tokio::test]
    async fn zero_login_attempts_still_logs_in_once() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut config = fake.config();
        config.max_login_attempts = 0;
        let mut client = CompendiumClient::new(config)
            .unwrap()
            .with_credentials(fake.credentials());

        client.fetch_by_id(5).await.unwrap();
        assert_eq!(fake.hits.login_posts(), 1);
        assert_eq!(fake.hits.content(), 1);

        let fake = spawn_fake(Behavior {
            expired_identity: true,
            ..Behavior::default()
        })
        .await;
        let mut config = fake.config();
        config.max_login_attempts = 0;
        let mut client = CompendiumClient::new(config)
            .unwrap()
            .with_credentials(fake.credentials());

        let err = client.fetch_by_id(5).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Session(SessionError::LoginExhausted { attempts: 1 })
        ));
        assert_eq!(fake.hits.login_posts(), 1);
    }

    #[tokio::test]
    async fn fetch_without_credentials_fails_before_any_get() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config()).unwrap();

        let err = client.fetch_by_id(1).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::NoCredentials)));
        assert_eq!(fake.hits.total(), 0);
    }

    #[tokio::test]
    async fn missing_page_is_status_error() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());

        let url = format!("{}/no-such-page.aspx", fake.base);
        let err = client.fetch_url(&url).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Network(NetworkError::Status { status, .. }) if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn search_without_session_makes_no_requests() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());

        let err = client.search("goblin").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Session(SessionError::NotAuthenticated)
        ));
        assert_eq!(fake.hits.total(), 0);
    }

    #[tokio::test]
    async fn search_after_login_returns_sorted_rows() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());
        client.login().await.unwrap();

        let rows = client.search_rows("o").await.unwrap();

        assert_eq!(fake.hits.search(), 1);
        let form = fake.last_search_form().unwrap();
        assert_eq!(form["Keywords"], "o");
        assert_eq!(form["Tab"], "Monster");

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].id, rows[0].name.as_str(), rows[0].level), (1, "Goblin", 1));
        assert_eq!((rows[1].id, rows[1].name.as_str(), rows[1].level), (2, "Orc", 2));
        assert_eq!(rows[1].combat_role, "Brute");
    }

    #[tokio::test]
    async fn search_body_is_raw_xml() {
        let fake = spawn_fake(Behavior::default()).await;
        let mut client = CompendiumClient::new(fake.config())
            .unwrap()
            .with_credentials(fake.credentials());
        client.login().await.unwrap();

        let body = client.search("orc").await.unwrap();
        assert_eq!(body.content_type(), Some("text/xml; charset=utf-8"));
        let xml = String::from_utf8(body.bytes().await.unwrap()).unwrap();
        assert!(xml.contains("<Monster>"));
    }

    #[tokio::test]
    async fn fetched_page_styles_can_be_fixed() {
        let fake = spawn_fake(Behavior::default()).await;
        let config = fake.config();
        let mut client = CompendiumClient::new(config.clone())
            .unwrap()
            .with_credentials(fake.credentials());

        let mut body = client.fetch_by_id(3).await.unwrap();
        let mut raw = Vec::new();
        while let Some(chunk) = body.chunk().await.unwrap() {
            raw.extend_from_slice(&chunk);
        }
        let html = String::from_utf8(raw).unwrap();

        let fixed = fix_styles_with_base(&html, &config.endpoints.styles_base);
        let expected = format!(r#"href="{}/styles/detail.css""#, fake.base);
        assert!(fixed.contains(&expected));
        assert!(fixed.contains(&format!("<style>{DETAIL_WIDTH_RULE}</style></head>")));
    }

    #[tokio::test]
    async fn combined_css_in_order_with_override() {
        let fake = spawn_fake(Behavior::default()).await;
        let client = CompendiumClient::new(fake.config()).unwrap();

        let css = client.combined_detail_css().await.unwrap();

        assert_eq!(
            css,
            "/* reset.css */\n/* site.css */\n/* detail.css */\n#detail { width: auto !important; }\n"
        );
        assert_eq!(fake.hits.styles(), 3);
        assert_eq!(fake.hits.login_pages(), 0);
    }
}
