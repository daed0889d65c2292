use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::User;

/// The authenticated session the dashboard renders for.
pub trait AuthProvider {
    fn user(&self) -> &User;
    fn sign_out(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signed_in_at: Option<String>,
}

/// Local session kept as a TOML file under the config directory.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
    user: User,
}

pub fn session_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/cloud-auditor/session.toml")
}

impl SessionFile {
    /// Returns `None` when nobody is signed in.
    pub fn load(home_dir: &Path) -> Result<Option<Self>> {
        let path = session_path(home_dir);
        if !path.exists() {
            return Ok(None);
        }
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read session: {}", path.display()))?;
        let record: SessionRecord = toml::from_str(&s)
            .with_context(|| format!("failed to parse session (TOML): {}", path.display()))?;
        let username = record.username.trim().to_string();
        if username.is_empty() {
            return Err(anyhow::anyhow!(
                "session has an empty username: {}",
                path.display()
            ));
        }
        Ok(Some(Self {
            path,
            user: User::new(username, record.email),
        }))
    }

    pub fn create(home_dir: &Path, user: User) -> Result<Self> {
        let path = session_path(home_dir);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| {
                format!("failed to create config directory: {}", dir.display())
            })?;
        }
        let record = SessionRecord {
            username: user.username.clone(),
            email: user.email.clone(),
            signed_in_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        };
        let s = toml::to_string_pretty(&record).context("failed to encode session (TOML)")?;
        std::fs::write(&path, s)
            .with_context(|| format!("failed to write session: {}", path.display()))?;
        Ok(Self { path, user })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuthProvider for SessionFile {
    fn user(&self) -> &User {
        &self.user
    }

    fn sign_out(&self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove session: {}", self.path.display()))
    }
}
