pub mod app;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod validation;

pub use app::{AppContext, Route};
pub use client::{ApiClient, ClientConfig, SessionInvalidationListener};
pub use error::{Error, Result};
pub use session::{Session, SessionKey, SessionStore, SqliteSessionStore};

/// Today's date in UTC, used as the default check-in date.
///
/// The server keys entries by UTC date. The local offset is not consulted; it can't be
/// determined reliably from a multi-threaded process on unix anyway.
pub fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

#[test]
fn test_today() {
    let before = time::OffsetDateTime::now_utc().date();
    let d = today();
    let after = time::OffsetDateTime::now_utc().date();
    assert!(before <= d && d <= after);
}
