//! Session model: the cookie jar proving who we are to the compendium.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// A single cookie as held in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    /// Lowercase, without a leading dot.
    pub domain: String,
    pub path: String,
    /// Sent only to `domain` itself, never to its subdomains.
    pub host_only: bool,
    /// Sent only over https.
    pub secure: bool,
    /// `None` for a browser-session cookie, which never counts as expired.
    pub expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    /// Create a host-only cookie scoped to `/` with no expiration.
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: &str) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: normalize_domain(domain),
            path: "/".to_string(),
            host_only: true,
            secure: false,
            expires: None,
        }
    }

    /// Set the expiration.
    #[must_use]
    pub fn expiring(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    /// Whether the cookie has expired at `now`. Expiring exactly at `now`
    /// counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Whether a browser would send this cookie with a request to `url`.
    pub fn applies_to(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        domain_matches(&self.domain, &host.to_ascii_lowercase(), self.host_only)
            && path_matches(&self.path, url.path())
    }

    fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.path == other.path && self.domain == other.domain
    }
}

/// Lowercase a domain and drop any leading dot.
pub(crate) fn normalize_domain(domain: &str) -> String {
    domain.trim_start_matches('.').to_ascii_lowercase()
}

pub(crate) fn domain_matches(cookie_domain: &str, host: &str, host_only: bool) -> bool {
    if host == cookie_domain {
        return true;
    }
    !host_only
        && host.len() > cookie_domain.len()
        && host.ends_with(cookie_domain)
        && host.as_bytes()[host.len() - cookie_domain.len() - 1] == b'.'
}

/// Whether a `Domain=` attribute of `domain` may widen a cookie set by `url`
/// to cover subdomains. IP hosts and dotless domains never qualify.
pub(crate) fn widens_to_domain(domain: &str, url: &Url) -> bool {
    let Some(url::Host::Domain(host)) = url.host() else {
        return false;
    };
    domain.contains('.') && domain_matches(domain, &host.to_ascii_lowercase(), false)
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// The set of cookies making up an authenticated session, keyed by domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    cookies: BTreeMap<String, Vec<StoredCookie>>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing one with the same name and path.
    pub fn insert(&mut self, cookie: StoredCookie) {
        let jar = self.cookies.entry(cookie.domain.clone()).or_default();
        match jar.iter_mut().find(|c| c.same_identity(&cookie)) {
            Some(existing) => *existing = cookie,
            None => jar.push(cookie),
        }
    }

    /// Merge a freshly received cookie. One that arrives already expired
    /// deletes its stored counterpart instead of being kept.
    pub fn absorb(&mut self, cookie: StoredCookie, now: DateTime<Utc>) {
        if cookie.is_expired_at(now) {
            self.remove(&cookie);
        } else {
            self.insert(cookie);
        }
    }

    fn remove(&mut self, cookie: &StoredCookie) {
        if let Some(jar) = self.cookies.get_mut(&cookie.domain) {
            jar.retain(|c| !c.same_identity(cookie));
            if jar.is_empty() {
                self.cookies.remove(&cookie.domain);
            }
        }
    }

    /// All cookies that apply to `url`, expired ones included.
    pub fn cookies_for<'a>(&'a self, url: &'a Url) -> impl Iterator<Item = &'a StoredCookie> {
        self.iter().filter(move |c| c.applies_to(url))
    }

    /// Value for a `Cookie` request header, or `None` if nothing applies.
    ///
    /// Longer paths go first, as browsers send them.
    pub fn cookie_header(&self, url: &Url, now: DateTime<Utc>) -> Option<String> {
        let mut cookies: Vec<_> = self
            .cookies_for(url)
            .filter(|c| !c.is_expired_at(now))
            .collect();
        if cookies.is_empty() {
            return None;
        }
        cookies.sort_by(|a, b| b.path.len().cmp(&a.path.len()));

        let pairs: Vec<String> = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// Iterate over every stored cookie.
    pub fn iter(&self) -> impl Iterator<Item = &StoredCookie> {
        self.cookies.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.cookies.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
