//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `api` - HTTP client for the temple-management backend REST API

pub mod api;

// Re-export commonly used types
pub use api::{ApiError, SosCreateRequest, TempleApi};
