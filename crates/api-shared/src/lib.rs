//! # API Shared
//!
//! Shared request and response definitions for the gateway REST API.
//!
//! Contains:
//! - JSON bodies exchanged with the authoring frontend, with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`; the core crate stays free of transport types.

pub mod health;
pub mod models;

pub use health::HealthService;
pub use models::*;
