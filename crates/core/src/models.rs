use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One addressable unit of a segmented deck.
///
/// `page` is 1-based and contiguous in source order; `bullets` start empty
/// and are filled in by summarization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slide {
    pub page: u32,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

impl Slide {
    /// Title, bullets, and body joined for lexical scoring.
    pub fn content_blob(&self) -> String {
        let mut blob = String::new();
        blob.push_str(&self.title);
        for bullet in &self.bullets {
            blob.push(' ');
            blob.push_str(bullet);
        }
        blob.push(' ');
        blob.push_str(&self.text);
        blob
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub user_message: String,
    pub ai_response: String,
}

/// Mutable per-session state accumulated across one deck's ingestion and
/// subsequent chat turns. Chat history lives only in the transient tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub raw_text: String,
    pub running_summary: String,
    pub slides: Vec<Slide>,
    pub chat_history: Vec<ChatTurn>,
    pub owner: Option<String>,
}

impl Session {
    pub fn slide_by_page(&self, page: u32) -> Option<&Slide> {
        self.slides.iter().find(|slide| slide.page == page)
    }

    /// Replace one slide's bullets by page match and append the slide's
    /// summary section to the running summary. A page with no matching
    /// slide leaves the session untouched.
    pub fn apply_slide_summary(&mut self, page: u32, bullets: Vec<String>) {
        let Some(slide) = self.slides.iter_mut().find(|slide| slide.page == page) else {
            return;
        };
        slide.bullets = bullets;

        let section = summary_section(slide.page, &slide.title, &slide.bullets);
        if !self.running_summary.is_empty() {
            self.running_summary.push_str("\n\n");
        }
        self.running_summary.push_str(&section);
    }

    pub fn record_turn(&mut self, user_message: impl Into<String>, ai_response: impl Into<String>) {
        self.chat_history.push(ChatTurn {
            user_message: user_message.into(),
            ai_response: ai_response.into(),
        });
    }
}

/// Render one slide's summary block: a header line followed by its bullets.
pub fn summary_section(page: u32, title: &str, bullets: &[String]) -> String {
    let mut section = format!("Slide {page}: {title}");
    for bullet in bullets {
        section.push_str("\n- ");
        section.push_str(bullet);
    }
    section
}

/// Ingestion-time snapshot persisted to the durable store. Chat history is
/// deliberately absent: durability covers ingestion results only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub owner: Option<String>,
    pub raw_text: String,
    pub summary_text: Option<String>,
    pub slides: Vec<Slide>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.session_id,
            raw_text: record.raw_text,
            running_summary: record.summary_text.unwrap_or_default(),
            slides: record.slides,
            chat_history: Vec::new(),
            owner: record.owner,
        }
    }
}

/// One incoming chat turn. A request carrying a deck path starts a new
/// session; otherwise `session_id` must name an existing one.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub deck: Option<PathBuf>,
    /// Opaque user reference recorded on sessions created by this request.
    pub owner: Option<String>,
}

/// Terminal outcome of a chat turn. User-facing failure states are values
/// here, not errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChatReply {
    Answer { response: String, session_id: String },
    Error { error: String },
}

impl ChatReply {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// Policy knobs for the slide summarizer.
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    /// Target output length as a fraction of the input word count.
    pub target_ratio: f32,
    pub max_bullets: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            target_ratio: 0.65,
            max_bullets: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> Vec<Slide> {
        vec![
            Slide {
                page: 1,
                title: "Intro".to_string(),
                text: "Welcome".to_string(),
                bullets: Vec::new(),
            },
            Slide {
                page: 2,
                title: "Details".to_string(),
                text: "Body".to_string(),
                bullets: Vec::new(),
            },
        ]
    }

    #[test]
    fn apply_slide_summary_updates_bullets_and_grows_summary() {
        let mut session = Session {
            id: "s".to_string(),
            raw_text: String::new(),
            running_summary: String::new(),
            slides: deck(),
            chat_history: Vec::new(),
            owner: None,
        };

        session.apply_slide_summary(2, vec!["first point".to_string()]);
        assert_eq!(session.slides[1].bullets, vec!["first point".to_string()]);
        assert_eq!(session.running_summary, "Slide 2: Details\n- first point");

        session.apply_slide_summary(1, vec!["welcome point".to_string()]);
        assert!(session.running_summary.starts_with("Slide 2: Details"));
        assert!(session.running_summary.contains("\n\nSlide 1: Intro"));
    }

    #[test]
    fn apply_slide_summary_ignores_unknown_page() {
        let mut session = Session {
            id: "s".to_string(),
            raw_text: String::new(),
            running_summary: String::new(),
            slides: deck(),
            chat_history: Vec::new(),
            owner: None,
        };

        session.apply_slide_summary(9, vec!["lost".to_string()]);
        assert!(session.running_summary.is_empty());
        assert!(session.slides.iter().all(|slide| slide.bullets.is_empty()));
    }

    #[test]
    fn session_from_record_starts_with_empty_history() {
        let record = SessionRecord {
            session_id: "abc".to_string(),
            owner: Some("user-1".to_string()),
            raw_text: "raw".to_string(),
            summary_text: None,
            slides: deck(),
            created_at: Utc::now(),
        };

        let session = Session::from(record);
        assert_eq!(session.id, "abc");
        assert!(session.running_summary.is_empty());
        assert!(session.chat_history.is_empty());
    }

    #[test]
    fn chat_reply_serializes_flat() {
        let reply = ChatReply::Answer {
            response: "hi".to_string(),
            session_id: "s1".to_string(),
        };
        let json = serde_json::to_value(&reply).expect("reply should serialize");
        assert_eq!(json["response"], "hi");
        assert_eq!(json["session_id"], "s1");

        let error = ChatReply::error("bad format");
        let json = serde_json::to_value(&error).expect("error should serialize");
        assert_eq!(json["error"], "bad format");
    }
}
