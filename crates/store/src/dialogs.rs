use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use forumbot_core::{DraftField, FeedbackDraft, SurveyState, UserId};

use crate::kv::{JsonStore, StoreError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct DialogDocument {
    /// Active survey step per user; a missing key means idle.
    #[serde(default)]
    states: BTreeMap<String, SurveyState>,
    #[serde(default)]
    drafts: BTreeMap<String, FeedbackDraft>,
    /// Message id of the most recently sent question, kept so the previous
    /// prompt can be deleted when the next one goes out.
    #[serde(default)]
    prompts: BTreeMap<String, String>,
}

/// The dialog namespace: survey state, draft answers, and pending prompt
/// reference, all persisted together after every mutation so that a crash
/// between steps never reverts a user to a question they already answered.
pub struct DialogStore {
    store: JsonStore,
    doc: Mutex<DialogDocument>,
}

impl DialogStore {
    /// Opens the namespace, recovering from a corrupt file by starting empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = JsonStore::new(path);
        let doc = store.load_or_default();
        Self { store, doc: Mutex::new(doc) }
    }

    pub async fn state(&self, user: UserId) -> Option<SurveyState> {
        self.doc.lock().await.states.get(&user.to_string()).copied()
    }

    pub async fn draft(&self, user: UserId) -> FeedbackDraft {
        self.doc.lock().await.drafts.get(&user.to_string()).cloned().unwrap_or_default()
    }

    pub async fn prompt(&self, user: UserId) -> Option<String> {
        self.doc.lock().await.prompts.get(&user.to_string()).cloned()
    }

    /// Starts a dialog: first step plus an empty draft, in one durable write.
    pub async fn begin(&self, user: UserId) -> Result<(), StoreError> {
        let key = user.to_string();
        let mut doc = self.doc.lock().await;
        doc.states.insert(key.clone(), SurveyState::AwaitingBenefit);
        doc.drafts.insert(key, FeedbackDraft::default());
        self.store.save(&*doc).await
    }

    /// Stores an answer and, when `advance` is set, moves the state pointer
    /// in the same durable write. Draft and state are never persisted out of
    /// step with each other.
    pub async fn record_answer(
        &self,
        user: UserId,
        field: DraftField,
        text: &str,
        advance: Option<SurveyState>,
    ) -> Result<(), StoreError> {
        let key = user.to_string();
        let mut doc = self.doc.lock().await;
        doc.drafts.entry(key.clone()).or_default().set(field, text);
        if let Some(next) = advance {
            doc.states.insert(key, next);
        }
        self.store.save(&*doc).await
    }

    /// Tracks the message reference of the question just sent.
    pub async fn set_prompt(&self, user: UserId, message_ref: &str) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().await;
        doc.prompts.insert(user.to_string(), message_ref.to_owned());
        self.store.save(&*doc).await
    }

    /// Removes and returns the tracked prompt reference, if any.
    pub async fn take_prompt(&self, user: UserId) -> Result<Option<String>, StoreError> {
        let mut doc = self.doc.lock().await;
        let taken = doc.prompts.remove(&user.to_string());
        if taken.is_some() {
            self.store.save(&*doc).await?;
        }
        Ok(taken)
    }

    /// Removes state, draft, and prompt reference for the user in one write.
    pub async fn clear(&self, user: UserId) -> Result<(), StoreError> {
        let key = user.to_string();
        let mut doc = self.doc.lock().await;
        let had_any = doc.states.remove(&key).is_some()
            | doc.drafts.remove(&key).is_some()
            | doc.prompts.remove(&key).is_some();
        if had_any {
            self.store.save(&*doc).await?;
        }
        Ok(())
    }

    pub async fn active_dialogs(&self) -> usize {
        self.doc.lock().await.states.len()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use forumbot_core::{DraftField, SurveyState, UserId};

    use super::DialogStore;

    const USER: UserId = UserId(41);

    #[tokio::test]
    async fn begin_sets_first_step_and_empty_draft() {
        let dir = TempDir::new().expect("temp dir");
        let dialogs = DialogStore::open(dir.path().join("dialogs.json"));

        dialogs.begin(USER).await.expect("begin");

        assert_eq!(dialogs.state(USER).await, Some(SurveyState::AwaitingBenefit));
        let draft = dialogs.draft(USER).await;
        assert!(draft.benefit.is_empty() && draft.direction.is_empty());
    }

    #[tokio::test]
    async fn record_answer_keeps_draft_and_state_consistent() {
        let dir = TempDir::new().expect("temp dir");
        let dialogs = DialogStore::open(dir.path().join("dialogs.json"));

        dialogs.begin(USER).await.expect("begin");
        dialogs
            .record_answer(USER, DraftField::Benefit, "ответ", Some(SurveyState::AwaitingDirection))
            .await
            .expect("record");

        assert_eq!(dialogs.state(USER).await, Some(SurveyState::AwaitingDirection));
        assert_eq!(dialogs.draft(USER).await.benefit, "ответ");
    }

    #[tokio::test]
    async fn mid_survey_state_survives_process_restart() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("dialogs.json");

        {
            let dialogs = DialogStore::open(&path);
            dialogs.begin(USER).await.expect("begin");
            dialogs
                .record_answer(USER, DraftField::Benefit, "первый ответ", Some(SurveyState::AwaitingDirection))
                .await
                .expect("record");
            dialogs.set_prompt(USER, "mid.123").await.expect("prompt");
        }

        // a fresh instance reads only what reached stable storage
        let reloaded = DialogStore::open(&path);
        assert_eq!(reloaded.state(USER).await, Some(SurveyState::AwaitingDirection));
        assert_eq!(reloaded.draft(USER).await.benefit, "первый ответ");
        assert_eq!(reloaded.prompt(USER).await.as_deref(), Some("mid.123"));
    }

    #[tokio::test]
    async fn clear_removes_all_three_mappings() {
        let dir = TempDir::new().expect("temp dir");
        let dialogs = DialogStore::open(dir.path().join("dialogs.json"));

        dialogs.begin(USER).await.expect("begin");
        dialogs.set_prompt(USER, "mid.9").await.expect("prompt");
        dialogs.clear(USER).await.expect("clear");

        assert_eq!(dialogs.state(USER).await, None);
        assert_eq!(dialogs.prompt(USER).await, None);
        assert!(dialogs.draft(USER).await.benefit.is_empty());
        assert_eq!(dialogs.active_dialogs().await, 0);
    }

    #[tokio::test]
    async fn take_prompt_is_consumed_once() {
        let dir = TempDir::new().expect("temp dir");
        let dialogs = DialogStore::open(dir.path().join("dialogs.json"));

        dialogs.set_prompt(USER, "mid.1").await.expect("prompt");
        assert_eq!(dialogs.take_prompt(USER).await.expect("take").as_deref(), Some("mid.1"));
        assert_eq!(dialogs.take_prompt(USER).await.expect("take again"), None);
    }
}
