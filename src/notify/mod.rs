//! # Notify Module
//!
//! Public email and SMS passthroughs that fall back to logging when no relay
//! is configured.

pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::notify_routes;
