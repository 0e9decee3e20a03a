//! Application Services
//!
//! Long-lived collaborators shared across requests.

mod session;

pub use session::{Session, SessionConfig, SessionManager};
