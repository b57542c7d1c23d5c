//! SupportDesk Server: HTTP API for the support chatbot.

pub mod auth;
pub mod error;
pub mod ingestion;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
