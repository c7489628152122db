//! HTTP API module.
//!
//! This module provides the HTTP server, HTML pages and API types.

pub mod logs;
pub mod pages;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState};
pub use types::*;
