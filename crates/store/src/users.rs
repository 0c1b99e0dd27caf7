use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use forumbot_core::{ChatId, UserId};

use crate::kv::{JsonStore, StoreError};

/// One registered user. Created on first interaction, the delivery address is
/// refreshed on every later one, and records are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserDocument {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

/// The user-registry namespace: one record per identity, keyed by the
/// stringified user id.
pub struct UserRegistry {
    store: JsonStore,
    doc: Mutex<UserDocument>,
}

impl UserRegistry {
    /// Opens the registry, recovering from a corrupt file by starting empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(path);
        let doc = store.load_or_default();
        Self { store, doc: Mutex::new(doc) }
    }

    /// Inserts or refreshes a record. A known delivery address is never
    /// overwritten with nothing.
    pub async fn upsert(&self, user_id: UserId, chat_id: Option<ChatId>) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        let record = doc
            .users
            .entry(user_id.to_string())
            .or_insert(UserRecord { user_id, chat_id: None });
        if chat_id.is_some() {
            record.chat_id = chat_id;
        }
        self.store.save(&*doc).await
    }

    pub async fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.doc.lock().await.users.get(&user_id.to_string()).cloned()
    }

    pub async fn all(&self) -> Vec<UserRecord> {
        self.doc.lock().await.users.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.doc.lock().await.users.len()
    }
}
