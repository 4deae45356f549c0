//! # API Shared
//!
//! Shared definitions for the QuickCode HTTP surface.
//!
//! Contains:
//! - Request/response wire types (`wire` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Kept free of core logic so any front end can depend on the wire shapes alone.

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
