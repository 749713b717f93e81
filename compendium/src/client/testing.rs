//! In-process fake compendium for client tests.
//!
//! Serves the login page, login form, detail pages, keyword search and
//! stylesheets on `127.0.0.1:0`, and counts every hit per endpoint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};

use crate::config::{ClientConfig, Endpoints};
use crate::models::Credentials;

pub const VIEW_TOKEN: &str = "vs-token";
pub const EVENT_TOKEN: &str = "ev-token";
const EMAIL: &str = "dm@example.test";
const PASSWORD: &str = "secret";

pub const SEARCH_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Data><Results>
<Monster><ID>2</ID><Name>Orc</Name><Level>2</Level><GroupRole>Standard</GroupRole><CombatRole>Brute</CombatRole><SourceBook>Monster Manual</SourceBook></Monster>
<Monster><ID>1</ID><Name>Goblin</Name><Level>1</Level><GroupRole>Minion</GroupRole><CombatRole>Skirmisher</CombatRole><SourceBook>Monster Manual</SourceBook></Monster>
</Results></Data>"#;

/// Knobs for misbehaving servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Behavior {
    /// Leave `__EVENTVALIDATION` off the login page.
    pub omit_tokens: bool,
    /// Issue the identity cookie already expired.
    pub expired_identity: bool,
    /// Answer both login requests with this status instead.
    pub login_status: Option<u16>,
}

#[derive(Debug, Default)]
pub struct Hits {
    login_pages: AtomicUsize,
    login_posts: AtomicUsize,
    content: AtomicUsize,
    search: AtomicUsize,
    styles: AtomicUsize,
}

impl Hits {
    pub fn login_pages(&self) -> usize {
        self.login_pages.load(Ordering::SeqCst)
    }
    pub fn login_posts(&self) -> usize {
        self.login_posts.load(Ordering::SeqCst)
    }
    pub fn content(&self) -> usize {
        self.content.load(Ordering::SeqCst)
    }
    pub fn search(&self) -> usize {
        self.search.load(Ordering::SeqCst)
    }
    pub fn styles(&self) -> usize {
        self.styles.load(Ordering::SeqCst)
    }
    pub fn total(&self) -> usize {
        self.login_pages() + self.login_posts() + self.content() + self.search() + self.styles()
    }
}

struct FakeState {
    behavior: Behavior,
    hits: Arc<Hits>,
    last_login_form: Mutex<Option<HashMap<String, String>>>,
    last_login_cookie: Mutex<Option<String>>,
    last_content_cookie: Mutex<Option<String>>,
    last_search_form: Mutex<Option<HashMap<String, String>>>,
}

/// Handle to a running fake server.
pub struct FakeCompendium {
    pub base: String,
    pub hits: Arc<Hits>,
    state: Arc<FakeState>,
}

impl FakeCompendium {
    /// Client config pointing at this server, with no stylesheet delay.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            endpoints: Endpoints::rooted_at(&self.base),
            css_delay_ms: 0,
            ..ClientConfig::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(EMAIL, PASSWORD)
    }

    pub fn last_login_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_login_form.lock().unwrap().clone()
    }

    pub fn last_login_cookie(&self) -> Option<String> {
        self.state.last_login_cookie.lock().unwrap().clone()
    }

    pub fn last_content_cookie(&self) -> Option<String> {
        self.state.last_content_cookie.lock().unwrap().clone()
    }

    pub fn last_search_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_search_form.lock().unwrap().clone()
    }
}

/// Start a fake compendium on an ephemeral port.
pub async fn spawn_fake(behavior: Behavior) -> FakeCompendium {
    let hits = Arc::new(Hits::default());
    let state = Arc::new(FakeState {
        behavior,
        hits: hits.clone(),
        last_login_form: Mutex::new(None),
        last_login_cookie: Mutex::new(None),
        last_content_cookie: Mutex::new(None),
        last_search_form: Mutex::new(None),
    });

    let app = Router::new()
        .route("/login.aspx", get(login_page).post(login_submit))
        .route("/monster.aspx", get(monster))
        .route("/CompendiumSearch.asmx/KeywordSearch", post(keyword_search))
        .route("/styles/{name}", get(stylesheet))
        .route("/scoped-cookies", get(scoped_cookies))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeCompendium {
        base: format!("http://{addr}"),
        hits,
        state,
    }
}

fn cookie_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn failure(status: u16) -> Response {
    StatusCode::from_u16(status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

async fn login_page(State(state): State<Arc<FakeState>>) -> Response {
    state.hits.login_pages.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = state.behavior.login_status {
        return failure(status);
    }

    let event = if state.behavior.omit_tokens {
        String::new()
    } else {
        format!(r#"<input type="hidden" name="__EVENTVALIDATION" value="{EVENT_TOKEN}" />"#)
    };
    let page = format!(
        r#"<html><body><form method="post">
<input type="hidden" name="__VIEWSTATE" value="{VIEW_TOKEN}" />
{event}
<input name="email" /><input name="password" type="password" />
</form></body></html>"#
    );

    (
        AppendHeaders([(SET_COOKIE, "ASP.NET_SessionId=sess-1; path=/; HttpOnly")]),
        Html(page),
    )
        .into_response()
}

async fn login_submit(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.hits.login_posts.fetch_add(1, Ordering::SeqCst);
    *state.last_login_cookie.lock().unwrap() = cookie_header(&headers);
    *state.last_login_form.lock().unwrap() = Some(form.clone());
    if let Some(status) = state.behavior.login_status {
        return failure(status);
    }

    let field = |name: &str| form.get(name).map(String::as_str);
    let credentials_ok = field("email") == Some(EMAIL) && field("password") == Some(PASSWORD);
    let tokens_ok = field("__VIEWSTATE").is_none()
        || (field("__VIEWSTATE") == Some(VIEW_TOKEN)
            && field("__EVENTVALIDATION") == Some(EVENT_TOKEN)
            && field("InsiderSignin") == Some("Sign In"));

    if !(credentials_ok && tokens_ok) {
        return Html("<html><body>Invalid email or password.</body></html>").into_response();
    }

    let identity = if state.behavior.expired_identity {
        "iPlanetDirectoryPro=tok-1; Max-Age=0; Path=/"
    } else {
        "iPlanetDirectoryPro=tok-1; Max-Age=3600; Path=/"
    };
    (
        StatusCode::FOUND,
        AppendHeaders([(SET_COOKIE, identity), (LOCATION, "/")]),
    )
        .into_response()
}

async fn monster(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.hits.content.fetch_add(1, Ordering::SeqCst);
    *state.last_content_cookie.lock().unwrap() = cookie_header(&headers);

    let id = query.get("id").cloned().unwrap_or_default();
    Html(format!(
        r#"<html><head><title>Monster</title><link rel="stylesheet" href="styles/detail.css" /></head><body><div id="detail">Monster {id}</div></body></html>"#
    ))
    .into_response()
}

async fn keyword_search(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.hits.search.fetch_add(1, Ordering::SeqCst);
    *state.last_search_form.lock().unwrap() = Some(form);
    ([(CONTENT_TYPE, "text/xml; charset=utf-8")], SEARCH_XML).into_response()
}

async fn stylesheet(State(state): State<Arc<FakeState>>, Path(name): Path<String>) -> Response {
    state.hits.styles.fetch_add(1, Ordering::SeqCst);
    ([(CONTENT_TYPE, "text/css")], format!("/* {name} */")).into_response()
}

/// Sets cookies whose `Domain` attributes a browser would only partly accept
/// from an IP host.
async fn scoped_cookies() -> Response {
    (
        AppendHeaders([
            (SET_COOKIE, "wide=1; Domain=0.0.1; Path=/"),
            (SET_COOKIE, "exact=1; Domain=127.0.0.1; Path=/"),
            (SET_COOKIE, "plain=1; Path=/"),
        ]),
        "ok",
    )
        .into_response()
}
