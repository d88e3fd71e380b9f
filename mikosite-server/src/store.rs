use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mikosite_core::{
    ActivityScore, Id, LinkedAccount, Post, PostImage, Reminder, Seminar, SeminarGroup, User,
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::error::AppError;

/// Rows keyed by id. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<T> {
    next_id: Id,
    rows: BTreeMap<Id, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    pub fn next_id(&self) -> Id {
        self.next_id
    }

    pub fn get(&self, id: Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.values_mut()
    }

    /// Rows for `ids` in the given order; unknown ids are skipped.
    pub fn pick(&self, ids: &[Id]) -> Vec<&T> {
        ids.iter().filter_map(|id| self.rows.get(id)).collect()
    }

    /// Stores `row` under `id`, replacing whatever was there.
    pub fn put(&mut self, id: Id, row: T) {
        self.next_id = self.next_id.max(id + 1);
        self.rows.insert(id, row);
    }

    /// Stores `row` under a fresh id, handing the id to `assign` first.
    pub fn insert_with(&mut self, row: T, assign: impl FnOnce(&mut T, Id)) -> Id {
        let id = self.next_id;
        let mut row = row;
        assign(&mut row, id);
        self.put(id, row);
        id
    }

    pub fn remove(&mut self, id: Id) -> Option<T> {
        self.rows.remove(&id)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.rows.retain(|_, row| keep(row));
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub seminar_groups: Table<SeminarGroup>,
    pub seminars: Table<Seminar>,
    pub reminders: Table<Reminder>,
    pub posts: Table<Post>,
    pub post_images: Table<PostImage>,
    pub users: Table<User>,
    pub linked_accounts: Table<LinkedAccount>,
    pub activity_scores: Table<ActivityScore>,
}

/// In-memory repository, optionally mirrored to a JSON snapshot on disk.
pub struct Store {
    tables: RwLock<Tables>,
    snapshot: Option<PathBuf>,
}

impl Store {
    pub fn in_memory(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            snapshot: None,
        }
    }

    /// Loads the snapshot at `path`, starting empty when it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();

        let tables = match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "snapshot not found, starting empty");
                Tables::default()
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot: Some(path),
        })
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    /// Rewrites the snapshot, if any. Callers hold the write guard so that
    /// snapshots land in the order the changes were made.
    pub async fn persist(&self, tables: &Tables) -> Result<(), AppError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let raw = serde_json::to_vec_pretty(tables)?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, raw).await?;
        fs::rename(&staging, path).await?;

        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Persists `staged` and only then makes it current. When the snapshot
    /// cannot be written `current` is left untouched.
    pub async fn commit(&self, current: &mut Tables, staged: Tables) -> Result<(), AppError> {
        self.persist(&staged).await?;
        *current = staged;
        Ok(())
    }
}
