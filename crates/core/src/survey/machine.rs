use crate::survey::states::{
    DraftField, SurveyAction, SurveyEvent, SurveyQuestion, SurveyState, TransitionOutcome,
};

/// Applies one event to a user's current survey state.
///
/// The step order is strictly monotonic: answers only ever move the dialog
/// forward, and the only way back to idle is completing the last step or an
/// explicit cancel. Free text while idle produces no actions at all; the bot
/// only consumes plain messages while a survey is active.
pub fn transition(current: Option<&SurveyState>, event: &SurveyEvent) -> TransitionOutcome {
    let from = current.copied();
    match (current, event) {
        // Starting (or restarting) always drops any in-flight draft and asks
        // the first question again.
        (_, SurveyEvent::Start) => TransitionOutcome {
            from,
            to: Some(SurveyState::AwaitingBenefit),
            actions: vec![
                SurveyAction::BeginDialog,
                SurveyAction::SendQuestion(SurveyQuestion::Benefit),
            ],
        },
        (Some(SurveyState::AwaitingBenefit), SurveyEvent::Answer(text)) => TransitionOutcome {
            from,
            to: Some(SurveyState::AwaitingDirection),
            actions: vec![
                SurveyAction::RecordAnswer {
                    field: DraftField::Benefit,
                    text: text.clone(),
                    advance: Some(SurveyState::AwaitingDirection),
                },
                SurveyAction::DeletePrompt,
                SurveyAction::SendQuestion(SurveyQuestion::Direction),
            ],
        },
        (Some(SurveyState::AwaitingDirection), SurveyEvent::Answer(text)) => TransitionOutcome {
            from,
            to: Some(SurveyState::AwaitingSuggestions),
            actions: vec![
                SurveyAction::RecordAnswer {
                    field: DraftField::Direction,
                    text: text.clone(),
                    advance: Some(SurveyState::AwaitingSuggestions),
                },
                SurveyAction::DeletePrompt,
                SurveyAction::SendQuestion(SurveyQuestion::Suggestions),
            ],
        },
        // Final answer: the draft is persisted before the flush so a crash
        // between the two cannot lose the first two answers, then everything
        // is cleared in one step.
        (Some(SurveyState::AwaitingSuggestions), SurveyEvent::Answer(text)) => TransitionOutcome {
            from,
            to: None,
            actions: vec![
                SurveyAction::RecordAnswer {
                    field: DraftField::Suggestions,
                    text: text.clone(),
                    advance: None,
                },
                SurveyAction::DeletePrompt,
                SurveyAction::FlushDraft,
                SurveyAction::ClearDialog,
                SurveyAction::AckCompletion,
            ],
        },
        (None, SurveyEvent::Answer(_)) => TransitionOutcome { from, to: None, actions: vec![] },
        (Some(_), SurveyEvent::Cancel) => TransitionOutcome {
            from,
            to: None,
            actions: vec![
                SurveyAction::DeletePrompt,
                SurveyAction::ClearDialog,
                SurveyAction::AckCancellation,
            ],
        },
        (None, SurveyEvent::Cancel) => TransitionOutcome { from, to: None, actions: vec![] },
    }
}
