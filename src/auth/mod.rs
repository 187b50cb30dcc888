//! # Auth Module
//!
//! Admin authorization for the console:
//! - `AdminGate` extractor guarding every admin route
//! - Role mapping from custom claims
//! - Session classification for the console's route guard

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::{authorize, bearer_token, AdminGate, GateFailure};
pub use models::{AccessDecision, Role};
pub use routes::auth_routes;
