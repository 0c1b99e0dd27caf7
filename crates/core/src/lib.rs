pub mod config;
pub mod dedup;
pub mod events;
pub mod feedback;
pub mod survey;

pub use dedup::DuplicateEventFilter;
pub use events::{ChatId, InboundEvent, UserId};
pub use feedback::{FeedbackEntry, FeedbackSink, SinkError};
pub use survey::machine::transition;
pub use survey::states::{
    DraftField, FeedbackDraft, SurveyAction, SurveyEvent, SurveyQuestion, SurveyState,
    TransitionOutcome,
};
