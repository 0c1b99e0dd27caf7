use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use forumbot_core::{DuplicateEventFilter, InboundEvent, UserId};
use forumbot_store::UserRegistry;

use crate::content;
use crate::gateway::{MessageGateway, OutgoingMessage};
use crate::survey::SurveyService;

/// Content and policy knobs the router needs, extracted from the app config
/// at bootstrap.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    pub registration_url: String,
    pub question_form_url: Option<String>,
    pub track_images: BTreeMap<String, String>,
    /// When set, `/send_feedback` is restricted to this user.
    pub admin_id: Option<i64>,
    pub send_delay: Duration,
}

/// How an event was disposed of, mostly for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Routed {
    Handled,
    Duplicate,
    Ignored,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Single entry point for normalized inbound events.
///
/// The duplicate filter runs before any dispatch, so a redelivered button
/// press can never trigger its handler twice. Handler failures are absorbed
/// here or below; routing itself never returns an error.
pub struct Router {
    filter: Mutex<DuplicateEventFilter>,
    users: Arc<UserRegistry>,
    survey: SurveyService,
    gateway: Arc<dyn MessageGateway>,
    settings: RouterSettings,
}

impl Router {
    pub fn new(
        users: Arc<UserRegistry>,
        survey: SurveyService,
        gateway: Arc<dyn MessageGateway>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            filter: Mutex::new(DuplicateEventFilter::default()),
            users,
            survey,
            gateway,
            settings,
        }
    }

    pub async fn route(&self, event: InboundEvent) -> Routed {
        if !self.filter.lock().await.observe(event.event_id.as_deref()) {
            debug!(user = %event.sender, event_id = ?event.event_id, "duplicate event dropped");
            return Routed::Duplicate;
        }

        if let Some(intent) = event.intent.clone() {
            return self.route_intent(&intent, &event).await;
        }
        if let Some(text) = event.text.clone() {
            return self.route_text(text.trim(), &event).await;
        }
        Routed::Ignored
    }

    async fn route_intent(&self, intent: &str, event: &InboundEvent) -> Routed {
        info!(user = %event.sender, intent, "button press");
        match intent {
            content::INTENT_REGISTERED => {
                self.delete_pressed(event).await;
                self.send_to(event, content::forum_info_message()).await;
                Routed::Handled
            }
            content::INTENT_SHOW_MENU => {
                self.delete_pressed(event).await;
                self.send_to(event, content::menu_message()).await;
                Routed::Handled
            }
            content::INTENT_SEND_QUESTION => {
                self.delete_pressed(event).await;
                let form_url = self.settings.question_form_url.as_deref();
                self.send_to(event, content::question_form_message(form_url)).await;
                Routed::Handled
            }
            content::INTENT_CANCEL_FEEDBACK => {
                self.delete_pressed(event).await;
                self.survey.cancel(event.sender, &event.display_name, event.chat_id).await;
                Routed::Handled
            }
            _ if intent.starts_with(content::TRACK_INTENT_PREFIX) => {
                let Some(track) = content::find_track(intent) else {
                    warn!(intent, "unknown track intent");
                    return Routed::Ignored;
                };
                self.delete_pressed(event).await;
                let image = content::track_image(&self.settings.track_images, intent);
                self.send_to(event, content::track_message(track, image)).await;
                Routed::Handled
            }
            _ => {
                debug!(intent, "unrecognized intent");
                Routed::Ignored
            }
        }
    }

    async fn route_text(&self, text: &str, event: &InboundEvent) -> Routed {
        match text {
            "/start" => {
                info!(user = %event.sender, "registration");
                if let Err(error) = self.users.upsert(event.sender, event.chat_id).await {
                    warn!(user = %event.sender, %error, "failed to persist user record");
                }
                self.send_to(event, content::welcome_message(&self.settings.registration_url)).await;
                Routed::Handled
            }
            "/send_feedback" => {
                if let Some(admin) = self.settings.admin_id {
                    if event.sender != UserId(admin) {
                        self.send_to(event, OutgoingMessage::text(content::no_permission_text()))
                            .await;
                        return Routed::Handled;
                    }
                }
                self.send_to(event, OutgoingMessage::text(content::broadcast_started_text())).await;
                let report = self.broadcast_feedback_requests().await;
                if report.total == 0 {
                    self.send_to(event, OutgoingMessage::text(content::broadcast_empty_text())).await;
                } else {
                    let summary = content::broadcast_report_text(
                        report.sent,
                        0,
                        report.skipped,
                        report.total,
                    );
                    self.send_to(event, OutgoingMessage::text(summary)).await;
                }
                Routed::Handled
            }
            _ if text.starts_with('/') => Routed::Ignored,
            _ => {
                // free text only matters to an active survey
                let consumed = self
                    .survey
                    .submit(event.sender, &event.display_name, event.chat_id, text)
                    .await;
                if consumed {
                    Routed::Handled
                } else {
                    Routed::Ignored
                }
            }
        }
    }

    /// Starts the survey for every registered user with a known delivery
    /// address. Users without one are skipped, not failed.
    pub async fn broadcast_feedback_requests(&self) -> BroadcastReport {
        let users = self.users.all().await;
        let mut report = BroadcastReport { total: users.len(), ..BroadcastReport::default() };

        for (i, record) in users.iter().enumerate() {
            let Some(chat) = record.chat_id else {
                report.skipped += 1;
                continue;
            };
            self.survey.start(record.user_id, "", Some(chat)).await;
            report.sent += 1;
            if i + 1 < users.len() {
                tokio::time::sleep(self.settings.send_delay).await;
            }
        }

        info!(sent = report.sent, skipped = report.skipped, total = report.total, "broadcast done");
        report
    }

    /// Best-effort removal of the message whose button was pressed.
    async fn delete_pressed(&self, event: &InboundEvent) {
        if let Some(message_ref) = &event.message_ref {
            if let Err(error) = self.gateway.delete(message_ref).await {
                warn!(user = %event.sender, %error, "failed to delete pressed message");
            }
        }
    }

    async fn send_to(&self, event: &InboundEvent, message: OutgoingMessage) {
        let Some(chat) = event.chat_id else {
            warn!(user = %event.sender, "no delivery address, reply not sent");
            return;
        };
        if let Err(error) = self.gateway.send(chat, &message).await {
            warn!(user = %event.sender, chat = %chat, %error, "failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use forumbot_core::{ChatId, InboundEvent, UserId};
    use forumbot_store::{DialogStore, UserRegistry};

    use crate::survey::test_support::{RecordingGateway, RecordingSink};
    use crate::survey::SurveyService;

    use super::{Routed, Router, RouterSettings};

    fn settings(admin_id: Option<i64>) -> RouterSettings {
        RouterSettings {
            registration_url: "https://example.ru/reg".to_owned(),
            question_form_url: None,
            track_images: BTreeMap::new(),
            admin_id,
            send_delay: Duration::from_millis(0),
        }
    }

    fn router(dir: &TempDir, admin_id: Option<i64>) -> (Router, Arc<UserRegistry>, Arc<RecordingGateway>, Arc<RecordingSink>) {
        let users = Arc::new(UserRegistry::open(dir.path().join("users.json")));
        let dialogs = Arc::new(DialogStore::open(dir.path().join("dialogs.json")));
        let sink = Arc::new(RecordingSink::default());
        let gateway = Arc::new(RecordingGateway::default());
        let survey = SurveyService::new(dialogs, sink.clone(), gateway.clone());
        let router = Router::new(users.clone(), survey, gateway.clone(), settings(admin_id));
        (router, users, gateway, sink)
    }

    #[tokio::test]
    async fn start_registers_the_user_and_sends_the_welcome() {
        let dir = TempDir::new().expect("temp dir");
        let (router, users, gateway, _) = router(&dir, None);

        let event = InboundEvent::text_message(UserId(1), "Анна", "/start").with_chat(ChatId(100));
        assert_eq!(router.route(event).await, Routed::Handled);

        let record = users.get(UserId(1)).await.expect("registered");
        assert_eq!(record.chat_id, Some(ChatId(100)));
        assert!(gateway.sent_texts()[0].contains("Рады приветствовать"));
    }

    #[tokio::test]
    async fn redelivered_button_press_is_dropped() {
        let dir = TempDir::new().expect("temp dir");
        let (router, _, gateway, _) = router(&dir, None);

        let event = InboundEvent::button_press(UserId(2), "Олег", "show_menu", Some("cb-1".to_owned()))
            .with_chat(ChatId(200));
        assert_eq!(router.route(event.clone()).await, Routed::Handled);
        assert_eq!(router.route(event).await, Routed::Duplicate);

        assert_eq!(gateway.sent.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn pressed_menu_message_is_deleted_before_the_reply() {
        let dir = TempDir::new().expect("temp dir");
        let (router, _, gateway, _) = router(&dir, None);

        let event = InboundEvent::button_press(UserId(3), "Ира", "track_ai", None)
            .with_chat(ChatId(300))
            .with_message_ref("mid.menu");
        assert_eq!(router.route(event).await, Routed::Handled);

        assert_eq!(gateway.deleted.lock().expect("lock").as_slice(), ["mid.menu"]);
        assert!(gateway.sent_texts()[0].contains("Первопроходцы"));
    }

    #[tokio::test]
    async fn unknown_intents_and_commands_are_ignored() {
        let dir = TempDir::new().expect("temp dir");
        let (router, _, gateway, _) = router(&dir, None);

        let press = InboundEvent::button_press(UserId(4), "Ким", "mystery", None).with_chat(ChatId(400));
        assert_eq!(router.route(press).await, Routed::Ignored);

        let command = InboundEvent::text_message(UserId(4), "Ким", "/unknown").with_chat(ChatId(400));
        assert_eq!(router.route(command).await, Routed::Ignored);

        // idle free text is left alone too
        let chatter = InboundEvent::text_message(UserId(4), "Ким", "привет").with_chat(ChatId(400));
        assert_eq!(router.route(chatter).await, Routed::Ignored);

        assert!(gateway.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn send_feedback_is_gated_to_the_admin() {
        let dir = TempDir::new().expect("temp dir");
        let (router, _, gateway, _) = router(&dir, Some(99));

        let event = InboundEvent::text_message(UserId(5), "Гость", "/send_feedback").with_chat(ChatId(500));
        assert_eq!(router.route(event).await, Routed::Handled);

        let texts = gateway.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("нет прав"));
    }

    #[tokio::test]
    async fn broadcast_starts_surveys_and_skips_addressless_users() {
        let dir = TempDir::new().expect("temp dir");
        let (router, users, _, _) = router(&dir, None);

        users.upsert(UserId(10), Some(ChatId(1000))).await.expect("upsert");
        users.upsert(UserId(11), None).await.expect("upsert");
        users.upsert(UserId(12), Some(ChatId(1200))).await.expect("upsert");

        let report = router.broadcast_feedback_requests().await;
        assert_eq!(report.sent, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total, 3);

        // a reached user is now mid-survey and their text is consumed
        let answer = InboundEvent::text_message(UserId(10), "Имя", "полезно").with_chat(ChatId(1000));
        assert_eq!(router.route(answer).await, Routed::Handled);
    }

    #[tokio::test]
    async fn cancel_button_ends_the_survey() {
        let dir = TempDir::new().expect("temp dir");
        let (router, users, gateway, sink) = router(&dir, None);

        users.upsert(UserId(20), Some(ChatId(2000))).await.expect("upsert");
        router.broadcast_feedback_requests().await;

        let cancel =
            InboundEvent::button_press(UserId(20), "Имя", "cancel_feedback", Some("cb-9".to_owned()))
                .with_chat(ChatId(2000));
        assert_eq!(router.route(cancel).await, Routed::Handled);

        assert!(sink.entries.lock().expect("lock").is_empty());
        assert!(gateway.sent_texts().last().expect("ack").contains("отменено"));
    }
}
