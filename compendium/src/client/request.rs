//! Request descriptors and the plumbing that sends them.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::error::NetworkError;
use crate::models::{normalize_domain, widens_to_domain, Session, StoredCookie};

/// HTTP methods the compendium needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything needed to issue one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    /// Form fields, sent url-encoded on POST.
    pub form: HashMap<String, String>,
    /// Attach the session's cookies.
    pub with_session: bool,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            form: HashMap::new(),
            with_session: false,
        }
    }

    pub fn post(url: impl Into<String>, form: HashMap<String, String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            form,
            with_session: false,
        }
    }

    /// Authenticated GET of a detail page.
    pub fn content(url: impl Into<String>) -> Self {
        Self::get(url).with_session()
    }

    /// Authenticated monster keyword search.
    pub fn search(url: impl Into<String>, keyword: &str) -> Self {
        let form = HashMap::from([
            ("Keywords".to_string(), keyword.to_string()),
            ("Tab".to_string(), "Monster".to_string()),
        ]);
        Self::post(url, form).with_session()
    }

    #[must_use]
    pub fn with_session(mut self) -> Self {
        self.with_session = true;
        self
    }
}

/// Send `desc`, attaching cookies from `session` when it asks for them.
///
/// Error statuses (4xx/5xx) become [`NetworkError::Status`]; redirects are
/// returned as-is when the client doesn't follow them.
pub(crate) async fn send(
    http: &reqwest::Client,
    desc: &RequestDescriptor,
    session: Option<&Session>,
) -> Result<reqwest::Response, NetworkError> {
    let url = Url::parse(&desc.url).map_err(|source| NetworkError::InvalidUrl {
        url: desc.url.clone(),
        source,
    })?;

    let cookie_header = session
        .filter(|_| desc.with_session)
        .and_then(|s| s.cookie_header(&url, Utc::now()));

    let mut request = match desc.method {
        Method::Get => http.get(url),
        Method::Post => http.post(url).form(&desc.form),
    };
    if let Some(header) = cookie_header {
        request = request.header(COOKIE, header);
    }

    debug!(method = ?desc.method, url = %desc.url, "sending request");
    let response = request
        .send()
        .await
        .map_err(|e| NetworkError::transport(&desc.url, e))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(NetworkError::Status {
            url: desc.url.clone(),
            status,
        });
    }

    debug!(url = %desc.url, %status, "response received");
    Ok(response)
}

/// Merge the cookies a response sets into `session`. Returns how many
/// cookies were accepted.
pub(crate) fn capture_cookies(
    response: &reqwest::Response,
    session: &mut Session,
    now: DateTime<Utc>,
) -> usize {
    let url = response.url();
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return 0;
    };

    let mut accepted = 0;
    for cookie in response.cookies() {
        let (domain, host_only) = match cookie.domain() {
            Some(domain) => {
                let domain = normalize_domain(domain);
                if domain == host {
                    (domain, !widens_to_domain(&host, url))
                } else if widens_to_domain(&domain, url) {
                    (domain, false)
                } else {
                    warn!(cookie = cookie.name(), %domain, %host, "ignoring cookie for foreign domain");
                    continue;
                }
            }
            None => (host.clone(), true),
        };

        let path = cookie
            .path()
            .filter(|p| p.starts_with('/'))
            .map_or_else(|| default_path(url.path()), ToString::to_string);

        // Max-Age wins over Expires.
        let expires = cookie
            .max_age()
            .and_then(|age| TimeDelta::from_std(age).ok())
            .and_then(|age| now.checked_add_signed(age))
            .or_else(|| cookie.expires().map(DateTime::<Utc>::from));

        debug!(cookie = cookie.name(), %domain, ?expires, "captured cookie");
        session.absorb(
            StoredCookie {
                name: cookie.name().to_string(),
                value: cookie.value().to_string(),
                domain,
                path,
                host_only,
                secure: cookie.secure(),
                expires,
            },
            now,
        );
        accepted += 1;
    }
    accepted
}

/// Cookie path used when `Set-Cookie` gives none: the request path up to its
/// last slash.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => request_path[..i].to_string(),
    }
}

/// A response body handed to the caller.
///
/// Owns the underlying response; dropping it releases the connection.
#[derive(Debug)]
pub struct ResponseBody {
    response: reqwest::Response,
}

impl ResponseBody {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self { response }
    }

    /// Final URL, after any redirects.
    pub fn url(&self) -> &str {
        self.response.url().as_str()
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Next chunk of the body, or `None` at the end.
    pub async fn chunk(&mut self) -> Result<Option<Vec<u8>>, NetworkError> {
        let url = self.url().to_string();
        self.response
            .chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(|e| NetworkError::transport(&url, e))
    }

    /// Read the rest of the body.
    pub async fn bytes(self) -> Result<Vec<u8>, NetworkError> {
        let url = self.url().to_string();
        self.response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| NetworkError::transport(&url, e))
    }

    /// Read the rest of the body as text.
    pub async fn text(self) -> Result<String, NetworkError> {
        let url = self.url().to_string();
        self.response
            .text()
            .await
            .map_err(|e| NetworkError::transport(&url, e))
    }
}
