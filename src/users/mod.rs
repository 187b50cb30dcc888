//! # Users Module
//!
//! This module handles account management for the console's `/api` surface:
//! - Listing every identity account, with the table's search and paging
//! - Account stats for the dashboard cards
//! - Partial updates, deletion and the admin role toggle
//! - Mirroring accounts into the `users` collection for `sync_users`

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod sync;
pub mod validators;


pub use routes::users_routes;
pub use sync::sync_auth_users;
