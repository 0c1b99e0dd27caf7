use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use forumbot_core::{FeedbackEntry, FeedbackSink, SinkError};

const HEADER: [&str; 6] = [
    "ID пользователя",
    "Имя",
    "Польза форума",
    "Интересные направления",
    "Предложения по улучшению",
    "Дата",
];

/// CSV-backed tabular log of completed surveys. The header row is written
/// when the file is first created; every append after that is unconditional.
/// Appends are funneled through one gate so concurrent survey completions
/// cannot interleave their rows.
pub struct CsvFeedbackLog {
    path: PathBuf,
    write_gate: Mutex<()>,
}

impl CsvFeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_gate: Mutex::new(()) }
    }
}

#[async_trait]
impl FeedbackSink for CsvFeedbackLog {
    async fn append(&self, entry: &FeedbackEntry) -> Result<(), SinkError> {
        let _guard = self.write_gate.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", csv_row(HEADER.iter().copied()))?;
        }

        let row = csv_row(
            [
                entry.user_id.to_string(),
                entry.display_name.clone(),
                entry.benefit.clone(),
                entry.direction.clone(),
                entry.suggestions.clone(),
                entry.submitted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
            .iter()
            .map(String::as_str),
        );
        writeln!(file, "{row}")?;
        file.flush()?;
        Ok(())
    }
}

fn csv_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields.map(csv_field).collect::<Vec<_>>().join(",")
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use forumbot_core::{FeedbackEntry, FeedbackSink, UserId};

    use super::CsvFeedbackLog;

    fn entry(user: i64, benefit: &str) -> FeedbackEntry {
        FeedbackEntry {
            user_id: UserId(user),
            display_name: "Иван Петров".to_owned(),
            benefit: benefit.to_owned(),
            direction: "GameDev".to_owned(),
            suggestions: "больше мастер-классов".to_owned(),
            submitted_at: Utc.with_ymd_and_hms(2025, 11, 14, 18, 30, 0).single().expect("ts"),
        }
    }

    #[tokio::test]
    async fn header_is_written_once_and_rows_accumulate() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("feedback.csv");
        let log = CsvFeedbackLog::new(&path);

        log.append(&entry(1, "a")).await.expect("first append");
        log.append(&entry(2, "b")).await.expect("second append");

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID пользователя,Имя"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[2].starts_with("2,"));
        assert!(lines[1].ends_with("2025-11-14 18:30:00"));
    }

    #[tokio::test]
    async fn answers_with_commas_and_quotes_are_escaped() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("feedback.csv");
        let log = CsvFeedbackLog::new(&path);

        log.append(&entry(3, "доклады, нетворкинг и \"кофе\"")).await.expect("append");

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("\"доклады, нетворкинг и \"\"кофе\"\"\""));
    }
}
