//! Session state: credential storage, backend health, the session gate, and
//! the protected-view gatekeeper.

pub mod auth;
pub mod health;
pub mod session;
pub mod token;
