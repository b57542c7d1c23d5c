//! SupportDesk Core: configuration, data directory layout, shared error type.

pub mod config;
pub mod error;

pub use config::{DataPaths, SupportDeskConfig};
pub use error::{Error, Result};
