//! Auth-session view state and the protected-view gatekeeper.
//!
//! SYSTEM CONTEXT
//! ==============
//! Route guards and identity-aware views consume this to decide between a
//! loading placeholder, the protected content, or a redirect to `/login`.
//! Everything here is pure; callers re-evaluate on every session transition
//! (see `SessionGate::subscribe`).

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use super::session::SessionState;
use crate::net::types::Identity;

pub const LOGIN_ROUTE: &str = "/login";

/// Authentication state tracking the current user and loading status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Identity>,
    /// True until the startup credential check has resolved.
    pub loading: bool,
}

impl From<&SessionState> for AuthState {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Unknown => Self { user: None, loading: true },
            SessionState::Authenticated(identity) => Self { user: Some(identity.clone()), loading: false },
            SessionState::Unauthenticated | SessionState::Authenticating => Self { user: None, loading: false },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    /// Startup check still pending; show a placeholder, never redirect.
    Loading,
    Render,
    Redirect { to: &'static str },
}

/// Decide what a protected view shows for `state`.
#[must_use]
pub fn allow(state: &SessionState) -> RouteDecision {
    let auth = AuthState::from(state);
    if auth.loading {
        RouteDecision::Loading
    } else if should_redirect_unauth(&auth) {
        RouteDecision::Redirect { to: LOGIN_ROUTE }
    } else {
        RouteDecision::Render
    }
}

/// Redirect to `/login` whenever auth has loaded and no user is present.
#[must_use]
pub fn should_redirect_unauth(state: &AuthState) -> bool {
    !state.loading && state.user.is_none()
}
