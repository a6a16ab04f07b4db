//! Kampus - school-scoped student assistant
//!
//! This library routes a student's chat message through a language model
//! that can call a school-specific retrieval tool or a web-search tool,
//! and keeps each login session's conversation isolated.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod retrieval;
pub mod schools;
pub mod session;
pub mod tools;

pub use error::{Error, Result};
