use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use forumbot_core::{
    transition, ChatId, FeedbackEntry, FeedbackSink, SurveyAction, SurveyEvent, TransitionOutcome,
    UserId,
};
use forumbot_store::DialogStore;

use crate::content;
use crate::gateway::{MessageGateway, OutgoingMessage};

/// Executes dialog machine transitions: persists draft and state, keeps the
/// tracked question prompt fresh, and flushes completed drafts to the
/// feedback log.
///
/// Every store or gateway failure inside a transition is logged and skipped
/// rather than propagated. State is persisted before messages go out, so a
/// failed send only costs the user a prompt, never their answers.
pub struct SurveyService {
    dialogs: Arc<DialogStore>,
    sink: Arc<dyn FeedbackSink>,
    gateway: Arc<dyn MessageGateway>,
}

impl SurveyService {
    pub fn new(
        dialogs: Arc<DialogStore>,
        sink: Arc<dyn FeedbackSink>,
        gateway: Arc<dyn MessageGateway>,
    ) -> Self {
        Self { dialogs, sink, gateway }
    }

    /// Starts (or restarts) the survey and sends the first question.
    pub async fn start(&self, user: UserId, display_name: &str, chat: Option<ChatId>) {
        let current = self.dialogs.state(user).await;
        let outcome = transition(current.as_ref(), &SurveyEvent::Start);
        self.execute(user, display_name, chat, outcome).await;
    }

    /// Feeds free text into the user's dialog. Returns `true` when the text
    /// was consumed as a survey answer; an idle user's text produces no
    /// actions and is left for other handlers.
    pub async fn submit(
        &self,
        user: UserId,
        display_name: &str,
        chat: Option<ChatId>,
        text: &str,
    ) -> bool {
        let current = self.dialogs.state(user).await;
        let outcome = transition(current.as_ref(), &SurveyEvent::Answer(text.to_owned()));
        if outcome.actions.is_empty() {
            return false;
        }
        self.execute(user, display_name, chat, outcome).await;
        true
    }

    pub async fn cancel(&self, user: UserId, display_name: &str, chat: Option<ChatId>) {
        let current = self.dialogs.state(user).await;
        let outcome = transition(current.as_ref(), &SurveyEvent::Cancel);
        self.execute(user, display_name, chat, outcome).await;
    }

    async fn execute(
        &self,
        user: UserId,
        display_name: &str,
        chat: Option<ChatId>,
        outcome: TransitionOutcome,
    ) {
        info!(user = %user, from = ?outcome.from, to = ?outcome.to, "survey transition");
        for action in outcome.actions {
            match action {
                SurveyAction::BeginDialog => {
                    if let Err(error) = self.dialogs.begin(user).await {
                        warn!(user = %user, %error, "failed to persist dialog start");
                    }
                }
                SurveyAction::RecordAnswer { field, text, advance } => {
                    if let Err(error) = self.dialogs.record_answer(user, field, &text, advance).await {
                        warn!(user = %user, %error, "failed to persist answer");
                    }
                }
                SurveyAction::DeletePrompt => {
                    let prompt = match self.dialogs.take_prompt(user).await {
                        Ok(prompt) => prompt,
                        Err(error) => {
                            warn!(user = %user, %error, "failed to consume prompt reference");
                            None
                        }
                    };
                    if let Some(message_ref) = prompt {
                        if let Err(error) = self.gateway.delete(&message_ref).await {
                            warn!(user = %user, %error, "failed to delete previous question");
                        }
                    }
                }
                SurveyAction::SendQuestion(question) => {
                    let Some(chat) = chat else {
                        warn!(user = %user, "no delivery address, question not sent");
                        continue;
                    };
                    match self.gateway.send(chat, &content::survey_question_message(question)).await {
                        Ok(Some(message_ref)) => {
                            if let Err(error) = self.dialogs.set_prompt(user, &message_ref).await {
                                warn!(user = %user, %error, "failed to track question prompt");
                            }
                        }
                        Ok(None) => {}
                        Err(error) => {
                            warn!(user = %user, %error, "failed to send question");
                        }
                    }
                }
                SurveyAction::FlushDraft => {
                    let draft = self.dialogs.draft(user).await;
                    let entry = FeedbackEntry::from_draft(user, display_name, &draft, Utc::now());
                    match self.sink.append(&entry).await {
                        Ok(()) => info!(user = %user, "feedback recorded"),
                        Err(error) => warn!(user = %user, %error, "failed to append feedback"),
                    }
                }
                SurveyAction::ClearDialog => {
                    if let Err(error) = self.dialogs.clear(user).await {
                        warn!(user = %user, %error, "failed to clear dialog");
                    }
                }
                SurveyAction::AckCompletion => {
                    self.send_text(user, chat, content::completion_ack_text()).await;
                }
                SurveyAction::AckCancellation => {
                    self.send_text(user, chat, content::cancellation_ack_text()).await;
                }
            }
        }
    }

    async fn send_text(&self, user: UserId, chat: Option<ChatId>, text: &str) {
        let Some(chat) = chat else {
            warn!(user = %user, "no delivery address, acknowledgement not sent");
            return;
        };
        if let Err(error) = self.gateway.send(chat, &OutgoingMessage::text(text)).await {
            warn!(user = %user, %error, "failed to send acknowledgement");
        }
    }
}
