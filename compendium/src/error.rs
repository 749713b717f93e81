//! Error taxonomy for the compendium client.
//!
//! Each failure category gets its own enum so callers can match on what
//! went wrong. `ClientError` wraps them for operations that can fail in more
//! than one way (a fetch that has to log in first, for example).

use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failures on a GET or POST.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// A configured endpoint is not a valid absolute URL.
    #[error("invalid URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an error status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
}

impl NetworkError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }
}

/// Failures while establishing a session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A login was required but no credentials were supplied.
    #[error("login required but no credentials were supplied")]
    NoCredentials,

    /// The login endpoint answered without setting any session cookie.
    #[error("login rejected: the server set no session cookies")]
    Rejected,

    /// A hidden form field the login form needs was not on the login page.
    #[error("login page is missing hidden field `{0}`")]
    MissingToken(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Failures caused by the state of the held session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a valid session and none is held.
    #[error("not authenticated: log in before searching")]
    NotAuthenticated,

    /// Logging in repeatedly still did not produce a valid session.
    #[error("session still invalid after {attempts} login attempt(s)")]
    LoginExhausted { attempts: u32 },
}

/// Failures while parsing a response body.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed search results")]
    SearchResults(#[source] quick_xml::DeError),
}

/// Any failure a client operation can produce.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
