//! # Functions Module
//!
//! This module serves the function-hosted account API including:
//! - User listing, creation, updates and deletion
//! - Role changes and password reset links
//! - Login logs and the one-time admin bootstrap
//!
//! Errors here use `{"error": ...}` bodies instead of `ApiError`, and every
//! account change is recorded in the `audit` collection.

pub mod audit;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use error::FunctionError;
pub use routes::functions_routes;
