use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conversation::HistoryItem;
use crate::settings::Language;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestChatRequest {
    pub message: String,
    pub session_id: String,
    pub language: Language,
    pub conversation_history: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestChatResponse {
    pub response: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub log_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wedding_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatbotSettingsPayload {
    pub chatbot_name: String,
    #[serde(default)]
    pub greeting_message_en: Option<String>,
    #[serde(default)]
    pub greeting_message_ar: Option<String>,
    #[serde(default)]
    pub suggested_questions_en: Option<Vec<String>>,
    #[serde(default)]
    pub suggested_questions_ar: Option<Vec<String>>,
}

impl ChatbotSettingsPayload {
    pub fn greeting_for(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.greeting_message_en.as_deref(),
            Language::Ar => self.greeting_message_ar.as_deref(),
        }
    }

    pub fn suggested_questions_for(&self, language: Language) -> Option<&[String]> {
        match language {
            Language::En => self.suggested_questions_en.as_deref(),
            Language::Ar => self.suggested_questions_ar.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatbotSettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chatbot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_message_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_message_ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions_en: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions_ar: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub log_id: String,
    pub was_helpful: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatbotStats {
    pub total_messages: u64,
    pub unique_sessions: u64,
    pub unanswered_count: u64,
    #[serde(default)]
    pub topics: BTreeMap<String, u64>,
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    pub helpful_count: u64,
    pub rated_count: u64,
    pub helpful_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub id: String,
    #[serde(default)]
    pub guest_id: Option<String>,
    pub session_id: String,
    pub user_message: String,
    pub bot_response: String,
    pub language: String,
    #[serde(default)]
    pub topic_detected: Option<String>,
    #[serde(default)]
    pub was_helpful: Option<bool>,
    pub could_not_answer: bool,
    // Naive ISO timestamps are common here, so the raw string is kept.
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogsResponse {
    pub total: u64,
    pub logs: Vec<ChatLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLogsQuery {
    pub limit: u32,
    pub offset: u32,
    pub session_id: Option<String>,
}

impl Default for ChatLogsQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            session_id: None,
        }
    }
}

impl ChatLogsQuery {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(session_id) = self.session_id.as_deref()
            && !session_id.trim().is_empty()
        {
            pairs.push(("session_id", session_id.to_string()));
        }
        pairs
    }
}
