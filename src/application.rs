//! Application layer module
//!
//! Orchestrates the scraping core for the conversation layer and keeps the
//! per-user session state.

pub mod movie_service;
pub mod session_manager;

pub use movie_service::MovieService;
pub use session_manager::{SessionError, SessionManager, UserSession};
