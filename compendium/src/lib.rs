//! Compendium - an authenticated-session client for the D&D Insider Compendium.
//!
//! Logs in (directly or through the ASP.NET login form), keeps the session
//! cookies, checks them locally before each request, and fetches monster
//! detail pages and keyword search results.
//!
//! Layout:
//! - `client` - the session-owning HTTP client (login, fetch, search, CSS)
//! - `session` - local validity checks and the on-disk session blob
//! - `models` - cookies, sessions, credentials, search rows
//! - `markup` - stylesheet fix-ups for fetched detail pages
//! - `config` - endpoints, login strategy, limits

pub mod client;
pub mod config;
pub mod error;
pub mod markup;
pub mod models;
pub mod session;
