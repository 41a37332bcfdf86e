// File: scorebot-core/src/repositories/file/credentials.rs

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use scorebot_common::models::Credential;
use crate::repositories::CredentialStore;
use crate::Error;

/// On-disk shape of the token file; `expiry_time` is epoch milliseconds.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    refresh_token: String,
    expiry_time: i64,
}

impl From<&Credential> for StoredToken {
    fn from(cred: &Credential) -> Self {
        Self {
            access_token: cred.access_token.clone(),
            refresh_token: cred.refresh_token.clone(),
            expiry_time: cred.expires_at.timestamp_millis(),
        }
    }
}

impl StoredToken {
    fn into_credential(self) -> Option<Credential> {
        let expires_at = DateTime::<Utc>::from_timestamp_millis(self.expiry_time)?;
        Some(Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// Single-record JSON token file (`token.json` by default).
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Credential>, Error> {
        let path = self.path.display().to_string();
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "token file not found");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = %path, error = %e, "token file read failed");
                return Ok(None);
            }
        };

        match serde_json::from_str::<StoredToken>(&data) {
            Ok(stored) => {
                let cred = stored.into_credential();
                if cred.is_none() {
                    warn!(path = %path, "token file has an out-of-range expiry_time");
                }
                Ok(cred)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "token file parse failed");
                Ok(None)
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<(), Error> {
        let path = self.path.display().to_string();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_string(&StoredToken::from(credential))?;

        // Owner-only from the first byte, then swapped in whole.
        let tmp = self.temp_path();
        let _ = tokio::fs::remove_file(&tmp).await;
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        let written = match file.write_all(data.as_bytes()).await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        drop(file);
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(path = %path, "credential saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Credential {
        Credential {
            access_token: "access-1".into(),
            refresh_token: "refresh-1".into(),
            // millisecond precision survives the file format
            expires_at: DateTime::<Utc>::from_timestamp_millis(
                (Utc::now() + Duration::hours(4)).timestamp_millis(),
            )
            .unwrap(),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_returns_same_credential() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path().join("nested").join("token.json"));
        let cred = sample();

        store.save(&cred).await?;
        assert_eq!(store.load().await?, Some(cred));
        Ok(())
    }

    #[tokio::test]
    async fn overwrite_replaces_record_and_leaves_no_temp_file() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token.json");
        let store = FileCredentialStore::new(&path);

        store.save(&sample()).await?;
        let mut next = sample();
        next.access_token = "access-2".into();
        store.save(&next).await?;

        assert_eq!(store.load().await?, Some(next));
        assert!(!dir.path().join("token.json.tmp").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_owner_only() -> Result<(), Error> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token.json");
        // A world-readable file from an older run is replaced, not reused.
        tokio::fs::write(&path, "{}").await?;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).await?;
        // So is a leftover temp file.
        tokio::fs::write(dir.path().join("token.json.tmp"), "stale").await?;

        FileCredentialStore::new(&path).save(&sample()).await?;

        let mode = tokio::fs::metadata(&path).await?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }

    #[tokio::test]
    async fn garbage_file_loads_as_none() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, "{not json").await?;

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reads_the_legacy_millisecond_format() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token.json");
        tokio::fs::write(
            &path,
            r#"{"access_token":"a","refresh_token":"r","expiry_time":1700000000000}"#,
        )
        .await?;

        let cred = FileCredentialStore::new(&path).load().await?.unwrap();
        assert_eq!(cred.expires_at.timestamp_millis(), 1_700_000_000_000);
        assert!(cred.is_expired());
        Ok(())
    }
}
