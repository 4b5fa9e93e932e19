//! Bearer-token session handling.
//!
//! The transport never touches storage directly. It reads the token through
//! a [`SessionContext`] on every request and reports a 401 back through it,
//! so a login or logout between two calls is picked up by the next one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Callback fired after a 401 cleared the token.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Source of the bearer token and sink for "session expired" events.
pub trait SessionContext: Send + Sync {
    /// Current token, if any.
    fn token(&self) -> Option<String>;

    /// Store a new token (login).
    fn set_token(&self, token: &str) -> anyhow::Result<()>;

    /// Forget the token (logout or 401).
    fn clear_token(&self);

    /// Called after a 401 response, once the token has been cleared.
    fn on_unauthorized(&self);
}

// ============ File-backed session ============

/// Token persisted in a single file.
///
/// The file is read on each [`token`](SessionContext::token) call; nothing
/// is cached in memory.
pub struct FileSession {
    path: PathBuf,
    hook: Option<UnauthorizedHook>,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hook: None,
        }
    }

    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionContext for FileSession {
    fn token(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn set_token(&self, token: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.trim())?;
        Ok(())
    }

    fn clear_token(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "session token cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "failed to clear token: {}", e),
        }
    }

    fn on_unauthorized(&self) {
        if let Some(hook) = &self.hook {
            hook();
        }
    }
}

// ============ In-memory session ============

/// Session held in memory. Counts 401 notifications.
#[derive(Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
    unauthorized: AtomicUsize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
            unauthorized: AtomicUsize::new(0),
        }
    }

    /// How many times [`on_unauthorized`](SessionContext::on_unauthorized) fired.
    pub fn unauthorized_count(&self) -> usize {
        self.unauthorized.load(Ordering::SeqCst)
    }
}

impl SessionContext for MemorySession {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> anyhow::Result<()> {
        let mut guard = self
            .token
            .write()
            .map_err(|_| anyhow::anyhow!("session lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    fn on_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::SeqCst);
    }
}
