//! Session models for the dashboard.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
