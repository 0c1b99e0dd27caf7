use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::events::UserId;
use crate::survey::states::FeedbackDraft;

/// Placeholder written instead of an answer that is unexpectedly empty. A
/// field should never legitimately be empty, but a defensive substitution
/// must not lose the other two answers.
pub const EMPTY_ANSWER_PLACEHOLDER: &str = "не указано";

/// One completed survey, ready to be appended to the tabular log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub benefit: String,
    pub direction: String,
    pub suggestions: String,
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn from_draft(
        user_id: UserId,
        display_name: impl Into<String>,
        draft: &FeedbackDraft,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            benefit: or_placeholder(&draft.benefit),
            direction: or_placeholder(&draft.direction),
            suggestions: or_placeholder(&draft.suggestions),
            submitted_at,
        }
    }
}

fn or_placeholder(answer: &str) -> String {
    if answer.trim().is_empty() {
        EMPTY_ANSWER_PLACEHOLDER.to_owned()
    } else {
        answer.to_owned()
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("feedback log io failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Tabular log consumed on survey completion. Appends are unconditional; the
/// dialog machine's own completion logic is the only safeguard against a
/// double append.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn append(&self, entry: &FeedbackEntry) -> Result<(), SinkError>;
}
