// File: chatlog-core/src/auth/file_store.rs
//
// JSON file holding the app token: {"access": "...", "expires_at": "<RFC 3339>"}.
// The file is owner read/write only; a directory created for it is owner-only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use chatlog_common::models::Token;
use chatlog_common::traits::TokenStore;

use crate::Error;

pub const DEFAULT_TOKEN_FILE: &str = ".secrets/twitch_tokens.json";

#[derive(Serialize, Deserialize)]
struct FileToken {
    access: String,
    expires_at: String,
}

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

impl FileTokenStore {
    /// An empty path falls back to `DEFAULT_TOKEN_FILE`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Self::default();
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load_app_token(&self) -> Result<Option<Token>, Error> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let payload: FileToken = serde_json::from_slice(&data)?;
        let expires_at = DateTime::parse_from_rfc3339(&payload.expires_at)?.with_timezone(&Utc);

        Ok(Some(Token {
            access: payload.access,
            expires_at,
        }))
    }

    async fn save_app_token(&self, token: &Token) -> Result<(), Error> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                let mut builder = tokio::fs::DirBuilder::new();
                builder.recursive(true);
                #[cfg(unix)]
                builder.mode(0o700);
                builder.create(dir).await?;
            }
        }

        let payload = FileToken {
            access: token.access.clone(),
            expires_at: token.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let data = serde_json::to_vec(&payload)?;

        // Written beside the target and renamed over it, so readers see the
        // old token or the new one, never a torn file.
        let tmp_path = self.tmp_path();
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        // `mode` only applies on creation; a leftover temp file may be looser.
        restrict_permissions(&tmp_path, 0o600).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path, _mode: u32) -> Result<(), Error> {
    Ok(())
}
