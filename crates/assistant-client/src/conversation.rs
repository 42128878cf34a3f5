use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Helpful,
    NotHelpful,
}

impl Feedback {
    pub fn from_helpful(helpful: bool) -> Self {
        if helpful {
            Self::Helpful
        } else {
            Self::NotHelpful
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Helpful => "helpful",
            Self::NotHelpful => "not_helpful",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    log_id: Option<String>,
    feedback: Option<Feedback>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), None)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into(), None)
    }

    pub fn assistant_reply(content: impl Into<String>, log_id: Option<String>) -> Self {
        let log_id = log_id.filter(|value| !value.trim().is_empty());
        Self::new(Role::Assistant, content.into(), log_id)
    }

    fn new(role: Role, content: String, log_id: Option<String>) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            log_id,
            feedback: None,
        }
    }

    pub fn log_id(&self) -> Option<&str> {
        self.log_id.as_deref()
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    pub fn is_rateable(&self) -> bool {
        self.role == Role::Assistant && self.log_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryItem {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn seed_greeting(&mut self, greeting: impl Into<String>) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(Message::assistant(greeting));
        true
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn update_feedback(&mut self, index: usize, feedback: Feedback) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.is_rateable() => {
                message.feedback = Some(feedback);
                true
            }
            _ => false,
        }
    }

    pub fn sendable_history(&self) -> Vec<HistoryItem> {
        self.messages.iter().map(HistoryItem::from).collect()
    }
}
