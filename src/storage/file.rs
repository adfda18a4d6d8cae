//! JSON-file token storage for native front ends.
//!
//! Every operation reads or rewrites the file synchronously so that separate
//! CLI invocations share one session. Writes go to a sibling temp file that
//! is renamed into place, so a crash never leaves a half-written file. On
//! unix the file is owner-only (`0600`).

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{StorageError, TokenKind, TokenStore};

/// Token store persisted as `{"access_token": "...", "refresh_token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, tokens: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, &serde_json::to_vec_pretty(tokens)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Write `bytes` to a file only the current user can read.
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its bits.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl TokenStore for FileTokenStore {
    fn get(&self, kind: TokenKind) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(kind.key()))
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StorageError> {
        let mut tokens = self.load()?;
        tokens.insert(kind.key().to_owned(), value.to_owned());
        self.save(&tokens)
    }

    fn clear(&self, kind: TokenKind) -> Result<(), StorageError> {
        let mut tokens = self.load()?;
        if tokens.remove(kind.key()).is_none() {
            return Ok(());
        }
        self.save(&tokens)
    }
}
