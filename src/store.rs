//! Credential store
//!
//! The `users` table (nickname → password hash) behind the
//! `CredentialStore` trait. The server persists it as a single JSON
//! document that is rewritten atomically on every registration.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::Nickname;

/// Lookup and insert of registered users
pub trait CredentialStore: Send + Sync {
    /// Stored password hash for `nickname`, if it is registered
    fn find_user(&self, nickname: &Nickname) -> Result<Option<String>, StoreError>;

    /// Register `nickname`. Returns `false` if it already exists.
    fn create_user(&mut self, nickname: &Nickname, password_hash: String)
        -> Result<bool, StoreError>;
}

/// One row of the users table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Salted password hash (never plaintext)
    pub password: String,
    #[serde(default)]
    pub created_at_epoch: u64,
}

/// On-disk document
#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

/// JSON-file backed user table
///
/// The whole table is loaded at open time and kept in memory; the file
/// is only read once.
#[derive(Debug)]
pub struct JsonUserStore {
    path: PathBuf,
    users: BTreeMap<String, UserRecord>,
}

impl JsonUserStore {
    /// Open the user database, creating an empty one if it does not exist
    ///
    /// A file that exists but cannot be read or parsed is an error; the
    /// server refuses to start rather than silently dropping accounts.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                users: BTreeMap::new(),
            };
            store.save()?;
            info!(path = %store.path.display(), "Created empty user database");
            return Ok(store);
        }

        let data = std::fs::read_to_string(&path)?;
        let file: UsersFile = serde_json::from_str(&data)?;
        info!(
            path = %path.display(),
            users = file.users.len(),
            "User database loaded"
        );

        Ok(Self {
            path,
            users: file.users,
        })
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Atomically write the table to disk.
    ///
    /// Writes to a temporary file, fsyncs, then renames for crash safety.
    /// File permissions are set to 0600 on Unix.
    ///
    /// This is blocking I/O and runs on the room's task, so it stalls the
    /// room for the length of one fsync. It only happens on registration.
    fn save(&self) -> Result<(), StoreError> {
        let file = UsersFile {
            users: self.users.clone(),
        };
        let data = serde_json::to_string_pretty(&file)?;

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = std::fs::File::create(&tmp_path)?;
        tmp.write_all(data.as_bytes())?;
        tmp.sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp_path, perms)?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), "User database saved");
        Ok(())
    }
}

impl CredentialStore for JsonUserStore {
    fn find_user(&self, nickname: &Nickname) -> Result<Option<String>, StoreError> {
        Ok(self
            .users
            .get(nickname.as_str())
            .map(|record| record.password.clone()))
    }

    fn create_user(
        &mut self,
        nickname: &Nickname,
        password_hash: String,
    ) -> Result<bool, StoreError> {
        if self.users.contains_key(nickname.as_str()) {
            return Ok(false);
        }

        let created_at_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.users.insert(
            nickname.as_str().to_string(),
            UserRecord {
                password: password_hash,
                created_at_epoch,
            },
        );

        // Keep memory and disk in agreement: a failed write is not a registration
        if let Err(e) = self.save() {
            self.users.remove(nickname.as_str());
            return Err(e);
        }
        Ok(true)
    }
}
