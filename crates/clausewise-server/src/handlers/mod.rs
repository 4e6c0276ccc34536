//! HTTP request handlers
//!
//! Each submodule contains the handler for one route; `stream` holds the
//! forwarder behind streaming submissions.

pub mod health;
pub mod home;
pub mod stream;
pub mod submit;

// Re-export all handlers for use in router
pub use health::*;
pub use home::*;
pub use submit::*;
