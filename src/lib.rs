//! # registro-client
//!
//! Client-side session and backend-availability gate for the Registro Violeta
//! counseling records API.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Base URL resolution and per-operation timeouts |
//! | [`net`] | Wire types, error taxonomy, and the REST transport |
//! | [`state`] | Token store, health prober, session gate, and gatekeeper |
//! | [`notify`] | User-visible notices and failure wording |
//! | [`records`] | Therapy session and client profile calls |

pub mod config;
pub mod net;
pub mod notify;
pub mod records;
pub mod state;

pub use config::{ClientConfig, ConfigError, Timeouts};
pub use net::error::ApiError;
pub use net::types::{HealthReport, Identity, RegisterProfile, Role};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use state::auth::{AuthState, RouteDecision};
pub use state::session::{SessionError, SessionGate, SessionState};
