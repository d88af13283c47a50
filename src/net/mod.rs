//! Networking: wire types, error taxonomy, and the REST transport.

pub mod api;
pub mod error;
pub mod types;
