//! Durable user/exercise store.
//!
//! One handle owns the whole user collection: the directory operations
//! (create, list) and the per-user append-only logs. The handle is created
//! once at startup and shared behind an `Arc`; there is no process-wide
//! global. When opened with a data path the collection is loaded from a
//! single JSON document and rewritten after every successful mutation.

use crate::error::{Error, Result};
use crate::model::{LogEntry, User};
use anyhow::Context;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// On-disk layout: the user collection, each user embedding its log.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    users: Vec<User>,
}

pub struct UserStore {
    users: DashMap<String, User>,
    /// Creation order of user ids; map iteration order is unspecified.
    order: Mutex<Vec<String>>,
    /// `None` keeps the collection in memory only.
    data_path: Option<PathBuf>,
}

impl UserStore {
    /// Store with no backing file. Used by tests and `--ephemeral`.
    pub fn in_memory() -> Self {
        Self {
            users: DashMap::new(),
            order: Mutex::new(Vec::new()),
            data_path: None,
        }
    }

    /// File-backed store. Loads the collection if the file already exists;
    /// the file is created on the first mutation otherwise.
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let store = Self {
            users: DashMap::new(),
            order: Mutex::new(Vec::new()),
            data_path: Some(path.clone()),
        };
        if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let collection: Collection = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            let mut order = store.order.lock().unwrap();
            for user in collection.users {
                order.push(user.id.clone());
                store.users.insert(user.id.clone(), user);
            }
        }
        Ok(store)
    }

    /// Create a new user with an empty log.
    pub fn create(&self, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidArgument("username is required".to_string()));
        }
        let user = User::new(username.to_string());
        self.users.insert(user.id.clone(), user.clone());
        self.order.lock().unwrap().push(user.id.clone());
        self.persist()?;
        Ok(user)
    }

    /// Every known user, in creation order.
    pub fn all_users(&self) -> Vec<User> {
        let order = self.order.lock().unwrap();
        order
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect()
    }

    /// Append an entry to the identified user's log and return the updated
    /// user snapshot. The map's entry lock serializes the read-modify-write
    /// per user; appends to other users proceed in parallel.
    pub fn append(&self, user_id: &str, entry: LogEntry) -> Result<User> {
        let updated = {
            let mut user = self
                .users
                .get_mut(user_id)
                .ok_or_else(|| Error::unknown_user(user_id))?;
            user.log.push(entry);
            user.clone()
        };
        // The in-memory append is the source of truth; a failed collection
        // write surfaces as Internal but does not roll the entry back.
        self.persist()?;
        Ok(updated)
    }

    /// Snapshot of one user. Readers never observe a torn log.
    pub fn get(&self, user_id: &str) -> Result<User> {
        self.users
            .get(user_id)
            .map(|u| u.value().clone())
            .ok_or_else(|| Error::unknown_user(user_id))
    }

    /// Full ordered log for one user.
    pub fn log_for(&self, user_id: &str) -> Result<Vec<LogEntry>> {
        Ok(self.get(user_id)?.log)
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.data_path else {
            return Ok(());
        };
        // The order lock doubles as the write lock, so concurrent mutations
        // rewrite the file one at a time.
        let order = self.order.lock().unwrap();
        let users: Vec<User> = order
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&Collection { users }).map_err(anyhow::Error::from)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
