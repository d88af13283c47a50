//! Session gate: the authentication state machine.
//!
//! DESIGN
//! ======
//! `SessionGate` is the single owner of the credential ([`TokenStore`]) and the
//! identity (carried inside [`SessionState::Authenticated`]), so the two are set
//! and cleared together. All mutable state lives behind one `std::sync::Mutex`
//! that is never held across an `.await`.
//!
//! ```text
//! Unknown ──bootstrap──▶ Unauthenticated ◀──────────────┐
//!    │                        │ login                   │ logout / 401 / failure
//!    └──bootstrap──▶ Authenticated ◀── Authenticating ──┘
//! ```
//!
//! Every transition bumps an epoch. Login and bootstrap responses are applied
//! only if the epoch is unchanged since the call went out, so a logout during
//! `Authenticating` makes the late response a no-op.
//!
//! AUTHENTICATED CALLS
//! ===================
//! [`SessionGate::execute_authorized`] is the one place where credentials are
//! attached and where a 401 forces the session to end. Logging out issues no
//! network calls, so expiry handling cannot loop.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::auth::{AuthState, RouteDecision, allow};
use super::health::HealthProber;
use super::token::{Credential, TokenPersistence, TokenStore};
use crate::config::{ClientConfig, ConfigError};
use crate::net::api::{ApiClient, read_json};
use crate::net::error::ApiError;
use crate::net::types::{HealthReport, Identity, RegisterProfile};
use crate::notify::{
    LOGGED_OUT_MESSAGE, Notice, Notifier, Operation, REGISTERED_MESSAGE, SESSION_EXPIRED_MESSAGE, failure_message,
    welcome_message,
};

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Startup credential check has not resolved yet. Never re-entered.
    #[default]
    Unknown,
    Unauthenticated,
    Authenticating,
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A classified backend failure. The user has already been notified.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An authenticated call was attempted without a credential. No request was sent.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A later transition (logout, another login) overtook this call; its result was dropped.
    #[error("superseded by a newer session transition")]
    Superseded,
}

impl SessionError {
    #[must_use]
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// GATE
// =============================================================================

struct GateState {
    session: SessionState,
    tokens: TokenStore,
    epoch: u64,
    bootstrapped: bool,
    last_health: Option<HealthReport>,
}

struct GateInner {
    api: ApiClient,
    prober: HealthProber,
    notifier: Arc<dyn Notifier>,
    state: Mutex<GateState>,
    watch_tx: watch::Sender<SessionState>,
}

/// Process-wide authentication gate. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionGate {
    inner: Arc<GateInner>,
}

impl SessionGate {
    #[must_use]
    pub fn new(api: ApiClient, tokens: TokenStore, notifier: Arc<dyn Notifier>) -> Self {
        let prober = HealthProber::new(&api);
        let (watch_tx, _) = watch::channel(SessionState::Unknown);
        let state = GateState {
            session: SessionState::Unknown,
            tokens,
            epoch: 0,
            bootstrapped: false,
            last_health: None,
        };
        Self { inner: Arc::new(GateInner { api, prober, notifier, state: Mutex::new(state), watch_tx }) }
    }

    /// Build a gate from config, loading any persisted credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn from_config(
        config: &ClientConfig,
        persistence: Box<dyn TokenPersistence>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        let api = ApiClient::new(config)?;
        Ok(Self::new(api, TokenStore::new(persistence), notifier))
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().session.clone()
    }

    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        AuthState::from(&self.lock().session)
    }

    /// Gatekeeper decision for the current state.
    #[must_use]
    pub fn route_decision(&self) -> RouteDecision {
        allow(&self.lock().session)
    }

    /// Observe every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.watch_tx.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.lock().session.identity().cloned()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().session == SessionState::Unknown
    }

    /// True while a login is in flight; front ends disable their submit control.
    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        self.lock().session == SessionState::Authenticating
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.lock().tokens.get().is_some()
    }

    #[must_use]
    pub fn last_health(&self) -> Option<HealthReport> {
        self.lock().last_health.clone()
    }

    /// Probe the backend and cache the report for the login guard.
    pub async fn check_health(&self) -> HealthReport {
        let report = self.inner.prober.probe().await;
        self.lock().last_health = Some(report.clone());
        report
    }

    /// Resolve the startup state. Runs at most once per gate.
    ///
    /// Without a stored credential the gate goes straight to `Unauthenticated`.
    /// Otherwise the credential is validated against `/api/auth/me`; any failure
    /// discards it.
    pub async fn bootstrap(&self) -> SessionState {
        let (credential, epoch) = {
            let mut st = self.lock();
            if st.bootstrapped || st.session != SessionState::Unknown {
                return st.session.clone();
            }
            st.bootstrapped = true;
            let Some(credential) = st.tokens.get().cloned() else {
                tracing::debug!("no stored credential");
                self.transition(&mut st, SessionState::Unauthenticated);
                return st.session.clone();
            };
            (credential, st.epoch)
        };

        let result = self.inner.api.current_user(&credential).await;

        let mut st = self.lock();
        if st.epoch != epoch {
            tracing::debug!("bootstrap result superseded");
            return st.session.clone();
        }
        match result {
            Ok(identity) => {
                tracing::info!(email = %identity.email, "stored credential validated");
                self.transition(&mut st, SessionState::Authenticated(identity));
            }
            Err(err) => {
                tracing::warn!(error = %err, code = err.error_code(), "stored credential rejected; discarding");
                if err.requires_probe() {
                    st.last_health = None;
                }
                st.tokens.clear();
                self.transition(&mut st, SessionState::Unauthenticated);
            }
        }
        st.session.clone()
    }

    /// Authenticate with email and password.
    ///
    /// Resolves the startup check first if it is still pending. When the last
    /// health report is missing or unhealthy the backend is probed again, and
    /// the login endpoint is skipped if that probe also fails.
    ///
    /// # Errors
    ///
    /// Returns the classified failure (already notified), or
    /// [`SessionError::Superseded`] if the session changed while the call was in flight.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        self.ensure_bootstrapped().await;
        self.ensure_reachable().await?;

        let epoch = {
            let mut st = self.lock();
            if st.tokens.get().is_some() {
                st.tokens.clear();
            }
            self.transition(&mut st, SessionState::Authenticating);
            st.epoch
        };
        tracing::info!(%email, "attempting login");

        let result = self.inner.api.login(email, password).await;

        let mut st = self.lock();
        if st.epoch != epoch {
            tracing::debug!(%email, "login response superseded");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(response) => {
                let user = response.user;
                st.tokens.set(Credential::new(response.access_token));
                self.transition(&mut st, SessionState::Authenticated(user.clone()));
                drop(st);
                tracing::info!(email = %user.email, "login succeeded");
                self.notify(Notice::success(welcome_message(user.display_name())));
                Ok(user)
            }
            Err(err) => {
                if err.requires_probe() {
                    st.last_health = None;
                }
                self.transition(&mut st, SessionState::Unauthenticated);
                drop(st);
                tracing::warn!(%email, error = %err, code = err.error_code(), "login failed");
                self.notify(Notice::error(failure_message(Operation::Login, &err)));
                Err(err.into())
            }
        }
    }

    /// Create an account. Leaves the session untouched.
    ///
    /// # Errors
    ///
    /// Returns the classified failure, already notified.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<(), SessionError> {
        match self.inner.api.register(profile).await {
            Ok(()) => {
                tracing::info!(email = %profile.email, "account registered");
                self.notify(Notice::success(REGISTERED_MESSAGE));
                Ok(())
            }
            Err(err) => {
                if err.requires_probe() {
                    self.lock().last_health = None;
                }
                tracing::warn!(email = %profile.email, error = %err, code = err.error_code(), "registration failed");
                self.notify(Notice::error(failure_message(Operation::Register, &err)));
                Err(err.into())
            }
        }
    }

    /// End the session. Returns `false` (and stays silent) if already logged out.
    pub fn logout(&self) -> bool {
        let changed = {
            let mut st = self.lock();
            self.clear_session(&mut st)
        };
        if changed {
            tracing::info!("logged out");
            self.notify(Notice::success(LOGGED_OUT_MESSAGE));
        }
        changed
    }

    /// Send `request` with the current credential attached.
    ///
    /// A 401 ends the session and notifies the user once, provided the rejected
    /// credential is still the current one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] without sending when no
    /// credential is held, otherwise the classified failure.
    pub async fn execute_authorized(&self, request: RequestBuilder) -> Result<Response, SessionError> {
        let (request, credential) = {
            let st = self.lock();
            (st.tokens.authorize(request), st.tokens.get().cloned())
        };
        let Some(credential) = credential else {
            return Err(SessionError::NotAuthenticated);
        };

        match self.inner.api.execute(request).await {
            Ok(response) => Ok(response),
            Err(err @ ApiError::AuthRejected { .. }) => {
                self.expire(&credential);
                Err(err.into())
            }
            Err(err) => Err(self.report_request_failure(err)),
        }
    }

    /// `GET path` as an authenticated call, decoding the JSON body.
    ///
    /// # Errors
    ///
    /// See [`SessionGate::execute_authorized`]; a malformed body is a server error.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        self.fetch_json(self.inner.api.request(Method::GET, path)).await
    }

    /// `POST path` with a JSON body as an authenticated call, decoding the JSON reply.
    ///
    /// # Errors
    ///
    /// See [`SessionGate::execute_authorized`]; a malformed body is a server error.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.fetch_json(self.inner.api.request(Method::POST, path).json(body)).await
    }

    /// Send a prepared request as an authenticated call, decoding the JSON reply.
    ///
    /// # Errors
    ///
    /// See [`SessionGate::execute_authorized`]; a malformed body is a server error.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SessionError> {
        let response = self.execute_authorized(request).await?;
        read_json(response).await.map_err(|err| self.report_request_failure(err))
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    /// `Unknown` is only ever left through the startup check.
    async fn ensure_bootstrapped(&self) {
        if !self.is_loading() {
            return;
        }
        let mut rx = self.subscribe();
        self.bootstrap().await;
        // Another task may own the check; wait for it to resolve.
        let _ = rx.wait_for(|state| *state != SessionState::Unknown).await;
    }

    async fn ensure_reachable(&self) -> Result<(), SessionError> {
        let cached_ok = self.lock().last_health.as_ref().is_some_and(|report| report.reachable);
        if cached_ok {
            return Ok(());
        }

        let report = self.check_health().await;
        if report.reachable {
            return Ok(());
        }

        let detail = report.detail.unwrap_or_else(|| "backend unreachable".to_owned());
        tracing::warn!(%detail, "login skipped: backend unreachable");
        let err = ApiError::Connectivity { detail };
        self.notify(Notice::error(failure_message(Operation::Login, &err)));
        Err(err.into())
    }

    /// Forced logout after a 401. Ignores rejections of a credential that has
    /// already been replaced or cleared.
    fn expire(&self, rejected: &Credential) -> bool {
        let changed = {
            let mut st = self.lock();
            if st.tokens.get() == Some(rejected) { self.clear_session(&mut st) } else { false }
        };
        if changed {
            tracing::warn!("credential rejected by backend; session expired");
            self.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
        } else {
            tracing::debug!("ignoring rejection of a stale credential");
        }
        changed
    }

    fn clear_session(&self, st: &mut GateState) -> bool {
        let signed_in = matches!(st.session, SessionState::Authenticated(_) | SessionState::Authenticating);
        if st.tokens.get().is_none() && !signed_in {
            return false;
        }
        st.tokens.clear();
        self.transition(st, SessionState::Unauthenticated);
        true
    }

    fn report_request_failure(&self, err: ApiError) -> SessionError {
        if err.requires_probe() {
            self.lock().last_health = None;
        }
        tracing::warn!(error = %err, code = err.error_code(), "authenticated request failed");
        self.notify(Notice::error(failure_message(Operation::Request, &err)));
        err.into()
    }

    fn transition(&self, st: &mut GateState, next: SessionState) {
        tracing::debug!(from = st.session.label(), to = next.label(), "session transition");
        st.session = next.clone();
        st.epoch = st.epoch.wrapping_add(1);
        self.inner.watch_tx.send_replace(next);
    }

    fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
