use std::fmt;

use thiserror::Error;

mod client;
mod contract;

pub use client::ChatApiClient;
pub use contract::{
    AdminChatRequest, AdminChatResponse, ChatLogEntry, ChatLogsQuery, ChatLogsResponse,
    ChatbotSettingsPayload, ChatbotSettingsUpdate, ChatbotStats, FeedbackRequest,
    GuestChatRequest, GuestChatResponse,
};

pub(crate) const GUEST_CHAT_SEGMENTS: [&str; 2] = ["chatbot", "chat"];
pub(crate) const GUEST_SETTINGS_SEGMENTS: [&str; 2] = ["chatbot", "settings"];
pub(crate) const FEEDBACK_SEGMENTS: [&str; 2] = ["chatbot", "feedback"];
// Trailing empty segment keeps the slash the admin route is mounted with.
pub(crate) const ADMIN_CHAT_SEGMENTS: [&str; 2] = ["chat", ""];
pub(crate) const ADMIN_SETTINGS_SEGMENTS: [&str; 3] = ["chatbot", "admin", "settings"];
pub(crate) const ADMIN_STATS_SEGMENTS: [&str; 3] = ["chatbot", "admin", "stats"];
pub(crate) const ADMIN_LOGS_SEGMENTS: [&str; 3] = ["chatbot", "admin", "logs"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    GuestChat,
    GuestSettings,
    Feedback,
    AdminChat,
    AdminSettings,
    AdminSettingsUpdate,
    AdminStats,
    AdminLogs,
}

impl ApiOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GuestChat => "guest_chat",
            Self::GuestSettings => "guest_settings",
            Self::Feedback => "feedback",
            Self::AdminChat => "admin_chat",
            Self::AdminSettings => "admin_settings",
            Self::AdminSettingsUpdate => "admin_settings_update",
            Self::AdminStats => "admin_stats",
            Self::AdminLogs => "admin_logs",
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("assistant api request timed out for {operation}")]
    Timeout { operation: ApiOperation },
    #[error("assistant api transport unavailable for {operation}: {message}")]
    TransportUnavailable {
        operation: ApiOperation,
        message: String,
    },
    #[error("assistant api request failed for {operation}: status={status} detail={detail}")]
    RequestFailed {
        operation: ApiOperation,
        status: u16,
        detail: String,
    },
    #[error("assistant api response invalid for {operation}: {message}")]
    ResponseInvalid {
        operation: ApiOperation,
        message: String,
    },
    #[error("invalid assistant api url: {message}")]
    InvalidUrl { message: String },
    #[error("failed to build assistant http client: {0}")]
    HttpClient(String),
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        operation: ApiOperation,
        backend: &'static str,
    },
}

impl ChatApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
