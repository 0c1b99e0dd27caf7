//! All user-facing copy and button layouts, kept in one place so handlers
//! stay free of string literals.

use std::collections::BTreeMap;

use forumbot_core::SurveyQuestion;

use crate::gateway::{Button, OutgoingMessage};

pub const INTENT_REGISTERED: &str = "registered";
pub const INTENT_SHOW_MENU: &str = "show_menu";
pub const INTENT_SEND_QUESTION: &str = "send_question";
pub const INTENT_CANCEL_FEEDBACK: &str = "cancel_feedback";
pub const TRACK_INTENT_PREFIX: &str = "track_";

pub struct Speaker {
    pub name: &'static str,
    pub bio: &'static str,
    pub time: &'static str,
}

pub struct ScheduleItem {
    pub time: &'static str,
    pub event: &'static str,
}

/// One forum track, addressed by its button intent.
pub struct Track {
    pub intent: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub speakers: &'static [Speaker],
    pub schedule: &'static [ScheduleItem],
}

pub static TRACKS: &[Track] = &[
    Track {
        intent: "track_gamedev",
        title: "🎮 GameDev: Творцы Цифровых Вселенных",
        description: "Раскроем тайны геймдизайна от создателей легендарных «Танков Онлайн» и хитового проекта «Ciliz». Узнаем, как строят карьеру в игрострое прямо в нашем регионе.",
        speakers: &[Speaker { name: "Имя Фамилия", bio: "Описание спикера", time: "10:00-11:00" }],
        schedule: &[
            ScheduleItem { time: "10:00-11:00", event: "Доклад о разработке игр" },
            ScheduleItem { time: "11:00-12:00", event: "Мастер-класс по геймдизайну" },
        ],
    },
    Track {
        intent: "track_ai",
        title: "🤖 ИИ: Первопроходцы цифровой трансформации",
        description: "Почувствуем мощь AI и узнаем, как нейросети меняют бизнес и нашу жизнь уже сегодня.",
        speakers: &[Speaker { name: "Имя Фамилия", bio: "Описание спикера", time: "10:00-11:00" }],
        schedule: &[
            ScheduleItem { time: "10:00-11:00", event: "Доклад об искусственном интеллекте" },
            ScheduleItem { time: "11:00-12:00", event: "Мастер-класс по нейросетям" },
        ],
    },
    Track {
        intent: "track_drones",
        title: "🚁 Беспилотники: Герои Воздушного Фронтира",
        description: "Не просто дроны, а высокие технологии. Испытаем себя на симуляторе полета и узнаем, как БПЛА применяют в реальных отраслях.",
        speakers: &[Speaker { name: "Имя Фамилия", bio: "Описание спикера", time: "10:00-11:00" }],
        schedule: &[
            ScheduleItem { time: "10:00-11:00", event: "Доклад о беспилотниках" },
            ScheduleItem { time: "11:00-12:00", event: "Демонстрация БПЛА" },
        ],
    },
    Track {
        intent: "track_media",
        title: "📡 Медиа Будущего: ценности и смыслы",
        description: "Разберемся, какие ценности и смыслы правят миром новых медиа и как в этом преуспеть.",
        speakers: &[Speaker { name: "Имя Фамилия", bio: "Описание спикера", time: "10:00-11:00" }],
        schedule: &[
            ScheduleItem { time: "10:00-11:00", event: "Доклад о медиа будущего" },
            ScheduleItem { time: "11:00-12:00", event: "Мастер-класс по созданию контента" },
        ],
    },
];

pub fn find_track(intent: &str) -> Option<&'static Track> {
    TRACKS.iter().find(|track| track.intent == intent)
}

pub fn welcome_message(registration_url: &str) -> OutgoingMessage {
    let text = "Рады приветствовать вас на форуме «Цифровая республика. ИТ-герои»\n\n\
        Это будет точка сборки IT-сообщества, где можно пообщаться с будущими работодателями, \
        вдохновиться историями успеха и определиться со своей траекторией в IT.\n\n\
        Когда - 14 ноября 2025 г.\n\
        Где - Ресурсный молодежный центр\n\
        г. Сыктывкар, ул. Первомайская, д. 72, 4 этаж\n\
        Программа форума:\n\
        https://olddigital.rkomi.ru/uploads/documents/programa_it_foruma_na_sayt_2025-10-23_16-15-15.pdf\n\n\
        Сайт форума:\n\
        https://olddigital.rkomi.ru/event/#visit";
    OutgoingMessage::text(text).with_buttons(vec![
        vec![Button::link("Зарегистрироваться", registration_url)],
        vec![Button::callback("Я зарегистрировался", INTENT_REGISTERED)],
    ])
}

fn track_menu_rows() -> Vec<Vec<Button>> {
    vec![
        vec![
            Button::callback("🎮 GameDev", "track_gamedev"),
            Button::callback("🤖 ИИ", "track_ai"),
        ],
        vec![
            Button::callback("🚁 Беспилотники", "track_drones"),
            Button::callback("📡 Медиа Будущего", "track_media"),
        ],
        vec![Button::callback("❓ Отправить вопрос", INTENT_SEND_QUESTION)],
    ]
}

/// Full forum description with the track menu, shown once after the user
/// confirms registration.
pub fn forum_info_message() -> OutgoingMessage {
    let text = "Форум «Цифровая республика. ИТ-герои».\n\n\
        Это будет точка сборки IT-сообщества, где можно пообщаться с будущими работодателями, \
        вдохновиться историями успеха и определиться со своей траекторией в IT.\n\n\
        4 главных IT-трека форума:\n\
        GameDev: Раскроем тайны геймдизайна от создателей легендарных «Танков Онлайн» и хитового проекта «Ciliz». \
        Узнаем, как строят карьеру в игрострое прямо в нашем регионе.\n\n\
        Искусственный интеллект: Почувствуем мощь AI и узнаем, как нейросети меняют бизнес и нашу жизнь уже сегодня.\n\n\
        Беспилотники: Не просто дроны, а высокие технологии. Испытаем себя на симуляторе полета и узнаем, \
        как БПЛА применяют в реальных отраслях.\n\n\
        Медиа будущего: Разберемся, какие ценности и смыслы правят миром новых медиа и как в этом преуспеть.\n\n\
        Кроме крутых спикеров участников ждут\n\
        HR-зона: Прямые разговоры с топовыми работодателями.\n\
        Лайфхак-сессии: Мастер-классы и тренинги, где научат не теории, а тому, что реально пригодится в работе.\n\
        Нетворкинг без границ: Находить команду и единомышленников в неформальной обстановке.\n\
        Техно-арт зона: Технологии на ощупь: фотозоны, демо-стенды, симуляторы.\n\
        Кружка кофе.";
    OutgoingMessage::text(text).with_buttons(track_menu_rows())
}

/// Short menu, shown when returning from a track page.
pub fn menu_message() -> OutgoingMessage {
    OutgoingMessage::text("Форум «Цифровая республика. ИТ-герои».\n\nВыберите интересующий трек:")
        .with_buttons(track_menu_rows())
}

pub fn track_message(track: &Track, image_url: Option<&str>) -> OutgoingMessage {
    let mut text = format!("{}\n\n{}\n\n", track.title, track.description);
    if !track.speakers.is_empty() {
        text.push_str("Спикеры:\n");
        for speaker in track.speakers {
            text.push_str(&format!("• {} ({})\n", speaker.name, speaker.time));
            if !speaker.bio.is_empty() {
                text.push_str(&format!("  {}\n", speaker.bio));
            }
        }
        text.push('\n');
    }
    if !track.schedule.is_empty() {
        text.push_str("Расписание:\n");
        for item in track.schedule {
            text.push_str(&format!("• {} - {}\n", item.time, item.event));
        }
    }

    let mut message = OutgoingMessage::text(text).with_buttons(vec![vec![
        Button::callback("◀️ Назад к меню", INTENT_SHOW_MENU),
        Button::callback("❓ Задать вопрос спикеру", INTENT_SEND_QUESTION),
    ]]);
    if let Some(url) = image_url {
        message = message.with_image(url);
    }
    message
}

/// Speaker-question flow delegates to an external form; without a configured
/// form URL the user is told to contact the organizers instead.
pub fn question_form_message(form_url: Option<&str>) -> OutgoingMessage {
    match form_url {
        Some(url) => OutgoingMessage::text(
            "Для отправки вопроса спикерам заполните форму по ссылке ниже:\n\n\
             В форме укажите:\n\
             • ФИО спикера\n\
             • Ваш вопрос",
        )
        .with_buttons(vec![
            vec![Button::link("Открыть форму для вопроса", url)],
            vec![Button::callback("◀️ Назад к меню", INTENT_SHOW_MENU)],
        ]),
        None => OutgoingMessage::text(
            "Для отправки вопроса заполните форму по ссылке.\n\
             ⚠️ Ссылка на форму не настроена. Обратитесь к администратору.",
        )
        .with_buttons(vec![vec![Button::callback("◀️ Назад к меню", INTENT_SHOW_MENU)]]),
    }
}

pub fn survey_question_message(question: SurveyQuestion) -> OutgoingMessage {
    let text = match question {
        SurveyQuestion::Benefit => {
            "Уважаемые участники форума,\n\n\
             Мы рады, что вы посетили наше мероприятие, и хотим услышать ваше мнение. \
             Ваши отзывы помогают нам улучшать организацию и содержание мероприятий.\n\n\
             Вопрос 1 из 3:\n\
             📌 Польза форума\n\
             Напишите ваше мнение о форуме. Что было полезно? Что вам понравилось?"
        }
        SurveyQuestion::Direction => {
            "Спасибо за ответ!\n\n\
             Вопрос 2 из 3:\n\
             📌 Интересные направления\n\
             Назовите самую понравившуюся секцию или направление форума:\n\n\
             • 🚁 «Герои Воздушного Фронтира» (Беспилотные летательные аппараты)\n\
             • 🎮 «Творцы Цифровых Вселенных» (GameDev/разработка игр)\n\
             • 🤖 «Первопроходцы цифровой трансформации» (Искусственный интеллект)\n\
             • 📡 «Медиа будущего: ценности и смыслы» (Медиа)\n\n\
             Или напишите свой вариант."
        }
        SurveyQuestion::Suggestions => {
            "Спасибо за ответ!\n\n\
             Вопрос 3 из 3:\n\
             📌 Предложения по улучшению\n\
             Что стоило бы добавить или убрать в программе будущего форума? \
             Что улучшить в организации и пр."
        }
    };
    OutgoingMessage::text(text)
        .with_buttons(vec![vec![Button::callback("❌ Отмена", INTENT_CANCEL_FEEDBACK)]])
}

pub fn completion_ack_text() -> &'static str {
    "✅ Спасибо за обратную связь! Ваше мнение сделает наши будущие события еще лучше."
}

pub fn cancellation_ack_text() -> &'static str {
    "Заполнение обратной связи отменено"
}

pub fn no_permission_text() -> &'static str {
    "У вас нет прав для выполнения этой команды."
}

pub fn broadcast_started_text() -> &'static str {
    "Начинаю рассылку запросов на обратную связь..."
}

pub fn broadcast_empty_text() -> &'static str {
    "⚠️ Список пользователей пуст. Попросите пользователей нажать /start."
}

pub fn broadcast_report_text(sent: usize, failed: usize, skipped: usize, total: usize) -> String {
    let mut report = format!(
        "✅ Рассылка завершена!\n\n\
         Успешно: {sent}\n\
         Ошибок: {failed}\n\
         Пропущено (нет chat_id): {skipped}\n\
         Всего: {total}"
    );
    if skipped > 0 {
        report.push_str("\n\n💡 Пользователи без chat_id должны нажать /start в боте.");
    }
    report
}

/// Resolves the configured image URL for a track intent; empty entries count
/// as unset.
pub fn track_image<'a>(images: &'a BTreeMap<String, String>, intent: &str) -> Option<&'a str> {
    images.get(intent).map(String::as_str).filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use forumbot_core::SurveyQuestion;

    use super::{
        find_track, question_form_message, survey_question_message, track_image, welcome_message,
        TRACKS,
    };
    use crate::gateway::Button;

    #[test]
    fn every_track_intent_resolves() {
        for track in TRACKS {
            assert!(find_track(track.intent).is_some());
        }
        assert!(find_track("track_quantum").is_none());
    }

    #[test]
    fn welcome_offers_registration_link_first() {
        let message = welcome_message("https://example.ru/reg");
        match &message.buttons[0][0] {
            Button::Link { url, .. } => assert_eq!(url, "https://example.ru/reg"),
            other => panic!("expected link button, got {other:?}"),
        }
    }

    #[test]
    fn every_survey_question_carries_a_cancel_button() {
        for question in [SurveyQuestion::Benefit, SurveyQuestion::Direction, SurveyQuestion::Suggestions] {
            let message = survey_question_message(question);
            let has_cancel = message.buttons.iter().flatten().any(|b| {
                matches!(b, Button::Callback { payload, .. } if payload == "cancel_feedback")
            });
            assert!(has_cancel);
        }
    }

    #[test]
    fn question_form_without_url_degrades_to_a_notice() {
        let message = question_form_message(None);
        assert!(message.text.contains("не настроена"));
        assert_eq!(message.buttons.len(), 1);
    }

    #[test]
    fn blank_track_image_counts_as_unset() {
        let mut images = BTreeMap::new();
        images.insert("track_ai".to_owned(), String::new());
        images.insert("track_media".to_owned(), "https://img.example.ru/m.png".to_owned());

        assert_eq!(track_image(&images, "track_ai"), None);
        assert_eq!(track_image(&images, "track_media"), Some("https://img.example.ru/m.png"));
        assert_eq!(track_image(&images, "track_gamedev"), None);
    }
}
