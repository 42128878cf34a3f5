use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{
    ADMIN_CHAT_SEGMENTS, ADMIN_LOGS_SEGMENTS, ADMIN_SETTINGS_SEGMENTS, ADMIN_STATS_SEGMENTS,
    AdminChatRequest, AdminChatResponse, ApiOperation, ChatApiError, ChatLogsQuery,
    ChatLogsResponse, ChatbotSettingsPayload, ChatbotSettingsUpdate, ChatbotStats,
    FEEDBACK_SEGMENTS, FeedbackRequest, GUEST_CHAT_SEGMENTS, GUEST_SETTINGS_SEGMENTS,
    GuestChatRequest, GuestChatResponse,
};
use crate::config::AssistantClientConfig;

#[derive(Clone)]
pub struct ChatApiClient {
    base_url: Url,
    admin_token: Option<String>,
    http_client: reqwest::Client,
}

impl ChatApiClient {
    pub fn new(base_url: Url, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            admin_token: None,
            http_client,
        }
    }

    pub fn from_config(config: &AssistantClientConfig) -> Result<Self, ChatApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|err| ChatApiError::HttpClient(err.to_string()))?;

        let client = Self::new(config.api_base_url.clone(), http_client);
        Ok(match config.admin_token.as_deref() {
            Some(token) => client.with_admin_token(token),
            None => client,
        })
    }

    pub fn with_admin_token(mut self, admin_token: impl AsRef<str>) -> Self {
        let trimmed = admin_token.as_ref().trim();
        if !trimmed.is_empty() {
            self.admin_token = Some(trimmed.to_string());
        }
        self
    }

    pub fn has_admin_token(&self) -> bool {
        self.admin_token.is_some()
    }

    pub async fn send_guest_message(
        &self,
        guest_token: &str,
        request: &GuestChatRequest,
    ) -> Result<GuestChatResponse, ChatApiError> {
        let url = self.endpoint(&GUEST_CHAT_SEGMENTS, Some(guest_token))?;
        self.execute(ApiOperation::GuestChat, self.http_client.post(url).json(request))
            .await
    }

    pub async fn fetch_guest_settings(
        &self,
        guest_token: &str,
    ) -> Result<ChatbotSettingsPayload, ChatApiError> {
        let url = self.endpoint(&GUEST_SETTINGS_SEGMENTS, Some(guest_token))?;
        self.execute(ApiOperation::GuestSettings, self.http_client.get(url))
            .await
    }

    pub async fn submit_feedback(&self, log_id: &str, was_helpful: bool) -> Result<(), ChatApiError> {
        let url = self.endpoint(&FEEDBACK_SEGMENTS, None)?;
        let payload = FeedbackRequest {
            log_id: log_id.to_string(),
            was_helpful,
        };
        self.execute_acknowledged(ApiOperation::Feedback, self.http_client.post(url).json(&payload))
            .await
    }

    pub async fn send_admin_message(
        &self,
        request: &AdminChatRequest,
    ) -> Result<AdminChatResponse, ChatApiError> {
        let url = self.endpoint(&ADMIN_CHAT_SEGMENTS, None)?;
        let builder = self.authorized(self.http_client.post(url).json(request));
        self.execute(ApiOperation::AdminChat, builder).await
    }

    pub async fn fetch_admin_settings(&self) -> Result<ChatbotSettingsPayload, ChatApiError> {
        let url = self.endpoint(&ADMIN_SETTINGS_SEGMENTS, None)?;
        let builder = self.authorized(self.http_client.get(url));
        self.execute(ApiOperation::AdminSettings, builder).await
    }

    pub async fn update_admin_settings(
        &self,
        update: &ChatbotSettingsUpdate,
    ) -> Result<ChatbotSettingsPayload, ChatApiError> {
        let url = self.endpoint(&ADMIN_SETTINGS_SEGMENTS, None)?;
        let builder = self.authorized(self.http_client.put(url).json(update));
        self.execute(ApiOperation::AdminSettingsUpdate, builder)
            .await
    }

    pub async fn fetch_stats(&self) -> Result<ChatbotStats, ChatApiError> {
        let url = self.endpoint(&ADMIN_STATS_SEGMENTS, None)?;
        let builder = self.authorized(self.http_client.get(url));
        self.execute(ApiOperation::AdminStats, builder).await
    }

    pub async fn fetch_chat_logs(
        &self,
        query: &ChatLogsQuery,
    ) -> Result<ChatLogsResponse, ChatApiError> {
        let url = self.endpoint(&ADMIN_LOGS_SEGMENTS, None)?;
        let builder = self.authorized(self.http_client.get(url).query(&query.query_pairs()));
        self.execute(ApiOperation::AdminLogs, builder).await
    }

    fn endpoint(&self, segments: &[&str], guest_token: Option<&str>) -> Result<Url, ChatApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ChatApiError::InvalidUrl {
                message: format!("{} cannot be used as a base url", self.base_url),
            })?;
            path.pop_if_empty().extend(segments);
            if let Some(guest_token) = guest_token {
                let trimmed = guest_token.trim();
                if trimmed.is_empty() {
                    return Err(ChatApiError::InvalidUrl {
                        message: "guest token must not be empty".to_string(),
                    });
                }
                path.push(trimmed);
            }
        }
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.admin_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<Res>(
        &self,
        operation: ApiOperation,
        builder: RequestBuilder,
    ) -> Result<Res, ChatApiError>
    where
        Res: DeserializeOwned,
    {
        let bytes = self.send_checked(operation, builder).await?;
        serde_json::from_slice::<Res>(&bytes).map_err(|err| ChatApiError::ResponseInvalid {
            operation,
            message: format!("failed to parse success response: {err}"),
        })
    }

    async fn execute_acknowledged(
        &self,
        operation: ApiOperation,
        builder: RequestBuilder,
    ) -> Result<(), ChatApiError> {
        self.send_checked(operation, builder).await.map(|_| ())
    }

    async fn send_checked(
        &self,
        operation: ApiOperation,
        builder: RequestBuilder,
    ) -> Result<Vec<u8>, ChatApiError> {
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                ChatApiError::Timeout { operation }
            } else {
                ChatApiError::TransportUnavailable {
                    operation,
                    message: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                ChatApiError::Timeout { operation }
            } else {
                ChatApiError::ResponseInvalid {
                    operation,
                    message: format!("failed to read response body: {err}"),
                }
            }
        })?;

        if !status.is_success() {
            return Err(ChatApiError::RequestFailed {
                operation,
                status: status.as_u16(),
                detail: parse_error_detail(&bytes),
            });
        }

        Ok(bytes.to_vec())
    }
}

fn parse_error_detail(body: &[u8]) -> String {
    let Some(detail) = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|envelope| envelope.get("detail").cloned())
    else {
        return "unknown".to_string();
    };

    match detail {
        Value::String(message) => message,
        Value::Null => "unknown".to_string(),
        other => other.to_string(),
    }
}
