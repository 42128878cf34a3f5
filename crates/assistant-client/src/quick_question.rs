use std::time::Duration;

use tracing::debug;

use crate::dispatch::{DispatchError, DispatchReceipt, MessageDispatcher, normalize_message};

pub const DEFAULT_QUICK_QUESTION_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct QuickQuestionFlow {
    dispatcher: MessageDispatcher,
    delay: Duration,
}

impl QuickQuestionFlow {
    pub(crate) fn new(dispatcher: MessageDispatcher, delay: Duration) -> Self {
        Self { dispatcher, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    // The send slot is taken before the delay so a second selection inside
    // the window is rejected like a manual send would be.
    pub async fn select(&self, prompt: &str) -> Result<DispatchReceipt, DispatchError> {
        let message = normalize_message(prompt)?;
        let slot = self.dispatcher.reserve()?;
        self.dispatcher.stage_draft(&message);

        debug!(
            session_id = %self.dispatcher.session().session_id(),
            delay = ?self.delay,
            "quick question selected"
        );
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.dispatcher.dispatch_reserved(slot, message).await
    }
}
