use serde::{Deserialize, Serialize};

/// Active step of the three-question feedback survey. A user with no entry in
/// the dialog namespace is implicitly idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyState {
    AwaitingBenefit,
    AwaitingDirection,
    AwaitingSuggestions,
}

impl SurveyState {
    /// 1-based position, used for ordering assertions and progress copy.
    pub fn step(&self) -> u8 {
        match self {
            Self::AwaitingBenefit => 1,
            Self::AwaitingDirection => 2,
            Self::AwaitingSuggestions => 3,
        }
    }
}

/// Partially filled survey answers, accumulated one field per completed step
/// and flushed to the feedback log when the last step completes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDraft {
    #[serde(default)]
    pub benefit: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub suggestions: String,
}

impl FeedbackDraft {
    pub fn set(&mut self, field: DraftField, text: impl Into<String>) {
        match field {
            DraftField::Benefit => self.benefit = text.into(),
            DraftField::Direction => self.direction = text.into(),
            DraftField::Suggestions => self.suggestions = text.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftField {
    Benefit,
    Direction,
    Suggestions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurveyQuestion {
    Benefit,
    Direction,
    Suggestions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurveyEvent {
    Start,
    Answer(String),
    Cancel,
}

/// Side effects the dialog service must perform, in order, to realize a
/// transition. The machine itself stays pure; persistence and gateway calls
/// happen in the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurveyAction {
    /// Initialize an empty draft alongside the first state.
    BeginDialog,
    /// Store the answer text and, when `advance` is set, move the state
    /// pointer in the same durable write so draft and state stay consistent.
    RecordAnswer {
        field: DraftField,
        text: String,
        advance: Option<SurveyState>,
    },
    /// Delete the previously sent question message, if one is tracked.
    DeletePrompt,
    /// Send the given question and track its message reference.
    SendQuestion(SurveyQuestion),
    /// Write the completed draft to the tabular feedback log.
    FlushDraft,
    /// Remove state, draft, and prompt reference for the user.
    ClearDialog,
    AckCompletion,
    AckCancellation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: Option<SurveyState>,
    pub to: Option<SurveyState>,
    pub actions: Vec<SurveyAction>,
}
