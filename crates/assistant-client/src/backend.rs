use std::future::Future;
use std::pin::Pin;

use crate::api::{
    AdminChatRequest, ApiOperation, ChatApiClient, ChatApiError, ChatbotSettingsPayload,
    GuestChatRequest,
};
use crate::conversation::HistoryItem;
use crate::settings::Language;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChatApiError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub guest_token: String,
    pub message: String,
    pub session_id: String,
    pub language: Language,
    pub conversation_history: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub topic: Option<String>,
    pub log_id: Option<String>,
}

pub trait AssistantBackend: Send + Sync {
    // `Ok(None)` means the backend has no personalization to offer.
    fn fetch_settings<'a>(
        &'a self,
        guest_token: &'a str,
    ) -> BackendFuture<'a, Option<ChatbotSettingsPayload>>;

    fn send_turn<'a>(&'a self, turn: ChatTurn) -> BackendFuture<'a, AssistantReply>;

    fn submit_feedback<'a>(&'a self, log_id: &'a str, was_helpful: bool) -> BackendFuture<'a, ()>;
}

#[derive(Clone)]
pub struct GuestBackend {
    client: ChatApiClient,
}

impl GuestBackend {
    pub fn new(client: ChatApiClient) -> Self {
        Self { client }
    }
}

impl AssistantBackend for GuestBackend {
    fn fetch_settings<'a>(
        &'a self,
        guest_token: &'a str,
    ) -> BackendFuture<'a, Option<ChatbotSettingsPayload>> {
        Box::pin(async move { self.client.fetch_guest_settings(guest_token).await.map(Some) })
    }

    fn send_turn<'a>(&'a self, turn: ChatTurn) -> BackendFuture<'a, AssistantReply> {
        Box::pin(async move {
            let request = GuestChatRequest {
                message: turn.message,
                session_id: turn.session_id,
                language: turn.language,
                conversation_history: turn.conversation_history,
            };
            let response = self
                .client
                .send_guest_message(&turn.guest_token, &request)
                .await?;

            Ok(AssistantReply {
                text: response.response,
                topic: response.topic,
                log_id: response.log_id,
            })
        })
    }

    fn submit_feedback<'a>(&'a self, log_id: &'a str, was_helpful: bool) -> BackendFuture<'a, ()> {
        Box::pin(async move { self.client.submit_feedback(log_id, was_helpful).await })
    }
}

#[derive(Clone)]
pub struct AdminBackend {
    client: ChatApiClient,
    wedding_id: Option<String>,
}

impl AdminBackend {
    pub fn new(client: ChatApiClient, wedding_id: Option<String>) -> Self {
        let wedding_id = wedding_id.filter(|value| !value.trim().is_empty());
        Self { client, wedding_id }
    }
}

impl AssistantBackend for AdminBackend {
    fn fetch_settings<'a>(
        &'a self,
        _guest_token: &'a str,
    ) -> BackendFuture<'a, Option<ChatbotSettingsPayload>> {
        Box::pin(async { Ok(None) })
    }

    fn send_turn<'a>(&'a self, turn: ChatTurn) -> BackendFuture<'a, AssistantReply> {
        Box::pin(async move {
            let guest_token = Some(turn.guest_token).filter(|value| !value.trim().is_empty());
            let request = AdminChatRequest {
                message: turn.message,
                conversation_history: turn.conversation_history,
                wedding_id: self.wedding_id.clone(),
                guest_token,
            };
            let response = self.client.send_admin_message(&request).await?;

            Ok(AssistantReply {
                text: response.response,
                topic: None,
                log_id: None,
            })
        })
    }

    fn submit_feedback<'a>(&'a self, _log_id: &'a str, _was_helpful: bool) -> BackendFuture<'a, ()> {
        Box::pin(async {
            Err(ChatApiError::Unsupported {
                operation: ApiOperation::Feedback,
                backend: "admin",
            })
        })
    }
}
