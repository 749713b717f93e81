//! Session validation and durable storage.

mod store;
mod validate;

pub use store::SessionStore;
pub use validate::{is_valid, is_valid_at};
