//! User-visible notifications.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session gate reports every outcome the user should see through a
//! [`Notifier`]: one notice per classified failure, plus one per successful
//! login, registration, or logout. Front ends decide how to render them.

#[cfg(test)]
#[path = "notify_test.rs"]
mod notify_test;

use crate::net::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Prints notices to stderr, keeping stdout free for command output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{marker}] {}", notice.message);
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Which gate operation produced a failure. Selects the user-facing wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    Request,
}

pub const CONNECTIVITY_MESSAGE: &str = "Connection error. Check that the server is running.";
pub const BAD_CREDENTIALS_MESSAGE: &str = "Incorrect email or password";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";
pub const DUPLICATE_ACCOUNT_MESSAGE: &str = "Email already registered or invalid data";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Try again later.";
pub const REJECTED_MESSAGE: &str = "The request was rejected";
pub const LOGGED_OUT_MESSAGE: &str = "Session closed";
pub const REGISTERED_MESSAGE: &str = "Account created. You can now log in.";

/// Human-readable message for a classified failure.
///
/// Server-side diagnostics are never shown; validation details from the
/// backend are, except on registration where the wording is fixed.
#[must_use]
pub fn failure_message(operation: Operation, err: &ApiError) -> String {
    match (operation, err) {
        (_, ApiError::Connectivity { .. }) => CONNECTIVITY_MESSAGE.to_owned(),
        (Operation::Login, ApiError::AuthRejected { .. }) => BAD_CREDENTIALS_MESSAGE.to_owned(),
        (_, ApiError::AuthRejected { .. }) => SESSION_EXPIRED_MESSAGE.to_owned(),
        (Operation::Register, ApiError::Validation { .. }) => DUPLICATE_ACCOUNT_MESSAGE.to_owned(),
        (_, ApiError::Validation { detail, .. }) => detail.clone().unwrap_or_else(|| REJECTED_MESSAGE.to_owned()),
        (_, ApiError::Server { .. }) => SERVER_ERROR_MESSAGE.to_owned(),
    }
}

#[must_use]
pub fn welcome_message(name: &str) -> String {
    format!("Welcome, {name}!")
}
