use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ChatApiError;
use crate::backend::AssistantBackend;
use crate::conversation::Feedback;
use crate::dispatch::{SharedChat, lock_chat};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("message {index} cannot be rated")]
    NotRateable { index: usize },
    #[error("feedback submission failed: {0}")]
    Submit(#[source] ChatApiError),
}

#[derive(Clone)]
pub struct FeedbackRecorder {
    backend: Arc<dyn AssistantBackend>,
    state: SharedChat,
}

impl FeedbackRecorder {
    pub(crate) fn new(backend: Arc<dyn AssistantBackend>, state: SharedChat) -> Self {
        Self { backend, state }
    }

    // The local rating is kept even when the submission fails.
    pub async fn record(&self, index: usize, helpful: bool) -> Result<(), FeedbackError> {
        let feedback = Feedback::from_helpful(helpful);
        let log_id = {
            let mut chat = lock_chat(&self.state);
            let log_id = chat
                .conversation
                .get(index)
                .and_then(|message| message.log_id())
                .map(ToString::to_string);
            match log_id {
                Some(log_id) if chat.conversation.update_feedback(index, feedback) => log_id,
                _ => return Err(FeedbackError::NotRateable { index }),
            }
        };

        match self.backend.submit_feedback(&log_id, helpful).await {
            Ok(()) => {
                debug!(log_id = %log_id, feedback = feedback.as_str(), "feedback submitted");
                Ok(())
            }
            Err(err) => {
                warn!(log_id = %log_id, feedback = feedback.as_str(), "feedback submission failed: {err}");
                Err(FeedbackError::Submit(err))
            }
        }
    }
}
