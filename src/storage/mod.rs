//! Durable storage for the access/refresh bearer token pair.
//!
//! DESIGN
//! ======
//! `TokenStore` is a plain synchronous key-value seam: no validation, no
//! expiry metadata. Expiry is only ever discovered through a 401 from the
//! API. Backends:
//! - `MemoryTokenStore`: process-local, used by tests and embedders.
//! - `FileTokenStore`: JSON file on disk, used by the `cms` CLI.
//! - `BrowserTokenStore`: `window.localStorage` (feature `browser`).

mod file;
mod memory;

#[cfg(feature = "browser")]
mod browser;

#[cfg(feature = "browser")]
pub use browser::BrowserTokenStore;
pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

/// Which of the two session tokens an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived credential attached to every API call.
    Access,
    /// Long-lived credential used only against `token/refresh/` and `logout/`.
    Refresh,
}

impl TokenKind {
    pub const ALL: [Self; 2] = [Self::Access, Self::Refresh];

    /// Storage key, shared by every backend.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

/// Errors raised when the underlying storage is unavailable or corrupt.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("token storage unavailable: {0}")]
    Unavailable(String),
    #[error("token storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence for the two session tokens.
pub trait TokenStore: Send + Sync {
    /// Read a token, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing storage cannot be read.
    fn get(&self, kind: TokenKind) -> Result<Option<String>, StorageError>;

    /// Store a token, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing storage cannot be written.
    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError>;

    /// Remove a token. Removing an absent token is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing storage cannot be written.
    fn clear(&self, kind: TokenKind) -> Result<(), StorageError>;

    /// Remove both tokens.
    ///
    /// # Errors
    ///
    /// Returns the first [`StorageError`] encountered.
    fn clear_all(&self) -> Result<(), StorageError> {
        for kind in TokenKind::ALL {
            self.clear(kind)?;
        }
        Ok(())
    }
}
