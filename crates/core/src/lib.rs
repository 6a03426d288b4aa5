//! Domain types and shared helpers for the routebook service.
//!
//! Route records, the ISO-8601 / epoch-millisecond timestamp encodings, input
//! validators, and the core error type. Storage and HTTP concerns live in
//! `routebook-store` and `routebook-api`.

pub mod error;
pub mod route;
pub mod time;
pub mod validate;

pub use error::CoreError;
pub use route::{RecordType, Route, RouteData, ServerRoute};
