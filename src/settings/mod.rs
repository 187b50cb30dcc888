//! # Settings Module
//!
//! This module handles the admin's own account and the moderation views:
//! - Profile and avatar updates
//! - Password change with re-verification
//! - Invoice CRUD with CSV and PDF export
//! - Contact submissions

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::settings_routes;
