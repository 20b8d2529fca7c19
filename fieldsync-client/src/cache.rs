//! Credential cache — expiry-gated persistence of the handshake result.
//!
//! Persists a versioned JSON document at `<home>/.fieldsync/credentials.json`.
//! Writes use an atomic `.tmp` + rename and chmod the file to 0600. Reads are
//! deliberately infallible: a missing, unreadable, corrupt, foreign-version,
//! or expired file is simply a miss, and the caller re-acquires.
//!
//! No locking — concurrent processes may race to refresh, which is idempotent
//! and merely wasteful.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldsync_core::Credential;

use crate::error::{cache_io_err, CacheError};

/// On-disk schema version. Bump when the layout changes; readers of a
/// foreign version treat the file as absent.
pub const CACHE_VERSION: u32 = 1;

/// On-disk cache payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub credential: Credential,
}

/// `<home>/.fieldsync/credentials.json` — pure, no I/O.
pub fn store_path_at(home: &Path) -> PathBuf {
    home.join(".fieldsync").join("credentials.json")
}

/// Load the cached credential, if one exists and is still valid at `now_ms`.
pub fn load_at(home: &Path, now_ms: i64) -> Option<Credential> {
    let path = store_path_at(home);
    let contents = std::fs::read_to_string(&path).ok()?;
    let file: CacheFile = match serde_json::from_str(&contents) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("discarding corrupt credential cache at {}: {e}", path.display());
            return None;
        }
    };
    if file.version != CACHE_VERSION {
        tracing::warn!(
            "discarding credential cache with version {} (expected {CACHE_VERSION})",
            file.version
        );
        return None;
    }
    if !file.credential.is_valid_at(now_ms) {
        tracing::debug!("cached credential expired");
        return None;
    }
    Some(file.credential)
}

/// Save a fresh credential atomically, overwriting any previous content.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, credential: &Credential) -> Result<(), CacheError> {
    let path = store_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(cache_io_err(
            path,
            std::io::Error::other("invalid credential cache path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| cache_io_err(dir, e))?;

    let file = CacheFile {
        version: CACHE_VERSION,
        saved_at: Utc::now(),
        credential: credential.clone(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| cache_io_err(&tmp, e))?;
    set_file_permissions(&tmp).map_err(|e| cache_io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| cache_io_err(&path, e))?;
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn credential(expires_at_ms: i64) -> Credential {
        Credential {
            token: "tok-abc".to_string(),
            expires_at_ms,
            session_cookie: "role-xyz".to_string(),
        }
    }

    #[test]
    fn miss_when_file_absent() {
        let home = TempDir::new().unwrap();
        assert_eq!(load_at(home.path(), 0), None);
    }

    #[test]
    fn roundtrip_before_expiry() {
        let home = TempDir::new().unwrap();
        let cred = credential(10_000);
        save_at(home.path(), &cred).unwrap();
        assert_eq!(load_at(home.path(), 9_999), Some(cred));
    }

    #[test]
    fn miss_at_and_after_expiry() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &credential(10_000)).unwrap();
        assert_eq!(load_at(home.path(), 10_000), None);
        assert_eq!(load_at(home.path(), 10_001), None);
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let home = TempDir::new().unwrap();
        let path = store_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_at(home.path(), 0), None);
    }

    #[test]
    fn foreign_version_is_a_miss() {
        let home = TempDir::new().unwrap();
        let path = store_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"version":99,"saved_at":"2026-01-01T00:00:00Z","credential":{"token":"t","expires":99999,"cookie":"c"}}"#,
        )
        .unwrap();
        assert_eq!(load_at(home.path(), 0), None);
    }

    #[test]
    fn save_overwrites_unconditionally() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &credential(1_000)).unwrap();
        let newer = Credential {
            token: "tok-new".to_string(),
            ..credential(2_000)
        };
        save_at(home.path(), &newer).unwrap();
        assert_eq!(load_at(home.path(), 0), Some(newer));
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let home = TempDir::new().unwrap();
        save_at(home.path(), &credential(1_000)).unwrap();
        let tmp = store_path_at(home.path()).with_extension("json.tmp");
        assert!(!tmp.exists(), "tmp file should be removed after atomic rename");
    }

    #[test]
    #[cfg(unix)]
    fn cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let home = TempDir::new().unwrap();
        save_at(home.path(), &credential(1_000)).unwrap();
        let mode = std::fs::metadata(store_path_at(home.path()))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }
}
