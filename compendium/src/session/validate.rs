//! Local session validity check. Never touches the network.

use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::debug;

use crate::models::Session;

/// Whether `session` is usable for `target_url` right now.
pub fn is_valid(session: Option<&Session>, target_url: &str, required: &[String]) -> bool {
    is_valid_at(session, target_url, required, Utc::now())
}

/// Whether `session` is usable for `target_url` at `now`.
///
/// Every required cookie name must have a cookie that applies to the URL and
/// has not expired. With no required names, holding a non-empty session is
/// enough.
pub fn is_valid_at(
    session: Option<&Session>,
    target_url: &str,
    required: &[String],
    now: DateTime<Utc>,
) -> bool {
    let Some(session) = session.filter(|s| !s.is_empty()) else {
        debug!("no session held");
        return false;
    };
    let Ok(url) = Url::parse(target_url) else {
        debug!(target_url, "cannot validate session for unparseable URL");
        return false;
    };

    for name in required {
        let live = session
            .cookies_for(&url)
            .any(|c| &c.name == name && !c.is_expired_at(now));
        if !live {
            debug!(cookie = %name, host = ?url.host_str(), "required cookie missing or expired");
            return false;
        }
    }

    true
}
