//! Data models for the compendium client.

mod credentials;
mod monster;
mod session;

pub use credentials::Credentials;
pub use monster::{parse_search_results, sort_rows, SearchResultRow};
pub use session::{Session, StoredCookie};

pub(crate) use session::{normalize_domain, widens_to_domain};
