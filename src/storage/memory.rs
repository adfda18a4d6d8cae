//! In-process token storage.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::HashMap;
use std::sync::Mutex;

use super::{StorageError, TokenKind, TokenStore};

/// Token store backed by a mutex-guarded map. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<TokenKind, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-seeded with a token pair.
    #[must_use]
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        if let Ok(mut tokens) = store.tokens.lock() {
            tokens.insert(TokenKind::Access, access.to_owned());
            tokens.insert(TokenKind::Refresh, refresh.to_owned());
        }
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TokenKind, String>>, StorageError> {
        self.tokens
            .lock()
            .map_err(|_| StorageError::Unavailable("token map lock poisoned".to_owned()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(&kind).cloned())
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(kind, value.to_owned());
        Ok(())
    }

    fn clear(&self, kind: TokenKind) -> Result<(), StorageError> {
        self.lock()?.remove(&kind);
        Ok(())
    }
}
