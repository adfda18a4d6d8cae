//! `window.localStorage` token storage for WASM front ends.

use super::{StorageError, TokenKind, TokenStore};

/// Token store backed by the browser's `localStorage`.
///
/// Holds no handle; the storage object is looked up per call so the type
/// stays `Send + Sync`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserTokenStore;

fn local_storage() -> Result<web_sys::Storage, StorageError> {
    web_sys::window()
        .ok_or_else(|| StorageError::Unavailable("no window".to_owned()))?
        .local_storage()
        .ok()
        .flatten()
        .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_owned()))
}

impl TokenStore for BrowserTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>, StorageError> {
        local_storage()?
            .get_item(kind.key())
            .map_err(|_| StorageError::Unavailable(format!("read {} failed", kind.key())))
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        local_storage()?
            .set_item(kind.key(), value)
            .map_err(|_| StorageError::Unavailable(format!("write {} failed", kind.key())))
    }

    fn clear(&self, kind: TokenKind) -> Result<(), StorageError> {
        local_storage()?
            .remove_item(kind.key())
            .map_err(|_| StorageError::Unavailable(format!("remove {} failed", kind.key())))
    }
}
