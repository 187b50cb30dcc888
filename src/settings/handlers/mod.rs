// src/settings/handlers/mod.rs

pub mod contacts;
pub mod invoices;
pub mod profile;
pub mod security;

pub use contacts::*;
pub use invoices::*;
pub use profile::*;
pub use security::*;
