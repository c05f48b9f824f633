// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential record and its on-disk cache file.
//!
//! The cache is a single JSON object `{access_token, refresh_token, expiry}`
//! with `expiry` as an RFC 3339 timestamp. Writes go through a temp file and
//! a rename, and the result is restricted to the owner on Unix.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tokens currently held for this process.
///
/// Always replaced or reset as a whole. When `access_token` is set, `expiry` is too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// A freshly issued record expiring `expires_in` seconds after `now`.
    pub fn issued(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token,
            expiry: Some(expiry_after(now, expires_in)),
        }
    }

    /// True when there is no expiry, or `now + buffer` has reached it.
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        let Some(expiry) = self.expiry else {
            return true;
        };
        match TimeDelta::from_std(buffer).ok().and_then(|b| now.checked_add_signed(b)) {
            Some(horizon) => horizon >= expiry,
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.expiry.is_none()
    }
}

/// `now + secs`, saturating at the latest representable instant.
pub fn expiry_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Failure reading or writing the cache file.
#[derive(Debug)]
pub enum CacheError {
    Io(io::Error),
    Format(serde_json::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cache io: {e}"),
            Self::Format(e) => write!(f, "cache format: {e}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Format(e) => Some(e),
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e)
    }
}

/// Read a cache file.
pub fn load(path: &Path) -> Result<CredentialRecord, CacheError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write a cache file atomically (write tmp + rename), owner read/write only.
pub fn save(path: &Path, record: &CredentialRecord) -> Result<(), CacheError> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(record)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    restrict_permissions(&tmp_path);
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Delete a cache file. Returns whether a file was removed.
pub fn remove(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), err = %e, "failed to restrict token cache permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
