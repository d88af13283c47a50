//! Credential storage.
//!
//! DESIGN
//! ======
//! `TokenStore` is the only owner of the bearer token. It keeps the value in
//! memory and mirrors it to a [`TokenPersistence`] backend so a restarted
//! process can pick it up again. Persistence failures are logged and swallowed:
//! the in-memory value stays authoritative for the running process.
//!
//! Outbound calls get the token through [`TokenStore::authorize`], an explicit
//! request-building step, instead of a client-wide default header.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reqwest::RequestBuilder;

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Opaque bearer token. Its shape is never inspected; the backend validates it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attach this token to `request` as `Authorization: Bearer <token>`.
    #[must_use]
    pub fn attach(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Durable backing for the token. Implementations must not panic.
pub trait TokenPersistence: Send + Sync {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn remove(&self);
}

impl<T: TokenPersistence + ?Sized> TokenPersistence for std::sync::Arc<T> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn save(&self, token: &str) {
        (**self).save(token);
    }

    fn remove(&self) {
        (**self).remove();
    }
}

/// Process-local persistence, for tests and embedders that keep no state on disk.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<String>>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { slot: Mutex::new(Some(token.to_owned())) }
    }

    #[must_use]
    pub fn stored(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

impl TokenPersistence for MemoryPersistence {
    fn load(&self) -> Option<String> {
        self.stored()
    }

    fn save(&self, token: &str) {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.to_owned());
    }

    fn remove(&self) {
        *self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

/// Stores the raw token in a single file.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenPersistence for FilePersistence {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| token.to_owned())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read token file");
                None
            }
        }
    }

    fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create token directory");
                return;
            }
        }
        if let Err(e) = write_private(&self.path, token) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist token");
        }
    }

    fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove token file"),
        }
    }
}

/// Write `contents` to `path`, readable only by the owner on unix.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies when the file is created.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())
}

// =============================================================================
// TOKEN STORE
// =============================================================================

pub struct TokenStore {
    current: Option<Credential>,
    persistence: Box<dyn TokenPersistence>,
}

impl TokenStore {
    /// Create a store, loading any token left behind by a previous process.
    #[must_use]
    pub fn new(persistence: Box<dyn TokenPersistence>) -> Self {
        let current = persistence.load().map(Credential::new);
        Self { current, persistence }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryPersistence::default()))
    }

    #[must_use]
    pub fn get(&self) -> Option<&Credential> {
        self.current.as_ref()
    }

    pub fn set(&mut self, credential: Credential) {
        self.persistence.save(credential.as_str());
        self.current = Some(credential);
    }

    /// Drop the token from memory and from the persistence backend.
    pub fn clear(&mut self) {
        self.current = None;
        self.persistence.remove();
    }

    /// Attach the current token, if any, to an outbound request.
    #[must_use]
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.current {
            Some(credential) => credential.attach(request),
            None => request,
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").field("current", &self.current).finish_non_exhaustive()
    }
}
