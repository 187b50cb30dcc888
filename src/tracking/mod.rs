//! # Tracking Module
//!
//! This module handles support tickets including:
//! - Ticket listing and status progression
//! - Admin chat replies on a ticket
//! - Realtime ticket and message streams over WebSocket

pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;


pub use routes::tracking_routes;
