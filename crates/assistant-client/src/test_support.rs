use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::api::{ApiOperation, ChatApiError, ChatbotSettingsPayload};
use crate::backend::{AssistantBackend, AssistantReply, BackendFuture, ChatTurn};

type Queue<T> = Mutex<VecDeque<Result<T, ChatApiError>>>;

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    settings: Queue<Option<ChatbotSettingsPayload>>,
    replies: Queue<AssistantReply>,
    feedback_results: Queue<()>,
    turns: Mutex<Vec<ChatTurn>>,
    feedback_calls: Mutex<Vec<(String, bool)>>,
    settings_calls: AtomicUsize,
    reply_gate: Option<Arc<Semaphore>>,
    settings_gate: Option<Arc<Semaphore>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Replies are held until the returned semaphore receives permits.
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.reply_gate = Some(gate.clone());
        (self, gate)
    }

    // Settings fetches are held until the returned semaphore receives permits.
    pub(crate) fn gated_settings(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.settings_gate = Some(gate.clone());
        (self, gate)
    }

    pub(crate) fn with_settings(self, result: Result<Option<ChatbotSettingsPayload>, ChatApiError>) -> Self {
        lock(&self.settings).push_back(result);
        self
    }

    pub(crate) fn with_reply(self, result: Result<AssistantReply, ChatApiError>) -> Self {
        lock(&self.replies).push_back(result);
        self
    }

    pub(crate) fn with_feedback_result(self, result: Result<(), ChatApiError>) -> Self {
        lock(&self.feedback_results).push_back(result);
        self
    }

    pub(crate) fn turns(&self) -> Vec<ChatTurn> {
        lock(&self.turns).clone()
    }

    pub(crate) fn feedback_calls(&self) -> Vec<(String, bool)> {
        lock(&self.feedback_calls).clone()
    }

    pub(crate) fn settings_calls(&self) -> usize {
        self.settings_calls.load(Ordering::SeqCst)
    }
}

impl AssistantBackend for ScriptedBackend {
    fn fetch_settings<'a>(
        &'a self,
        _guest_token: &'a str,
    ) -> BackendFuture<'a, Option<ChatbotSettingsPayload>> {
        Box::pin(async move {
            self.settings_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.settings_gate.as_ref() {
                let permit = gate.acquire().await.expect("gate stays open");
                permit.forget();
            }
            lock(&self.settings)
                .pop_front()
                .unwrap_or_else(|| Err(transport_error()))
        })
    }

    fn send_turn<'a>(&'a self, turn: ChatTurn) -> BackendFuture<'a, AssistantReply> {
        Box::pin(async move {
            lock(&self.turns).push(turn);
            if let Some(gate) = self.reply_gate.as_ref() {
                let permit = gate.acquire().await.expect("gate stays open");
                permit.forget();
            }
            lock(&self.replies)
                .pop_front()
                .unwrap_or_else(|| Err(transport_error()))
        })
    }

    fn submit_feedback<'a>(&'a self, log_id: &'a str, was_helpful: bool) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            lock(&self.feedback_calls).push((log_id.to_string(), was_helpful));
            lock(&self.feedback_results).pop_front().unwrap_or(Ok(()))
        })
    }
}

pub(crate) fn reply(text: &str, log_id: Option<&str>) -> Result<AssistantReply, ChatApiError> {
    Ok(AssistantReply {
        text: text.to_string(),
        topic: None,
        log_id: log_id.map(ToString::to_string),
    })
}

pub(crate) fn transport_error() -> ChatApiError {
    ChatApiError::TransportUnavailable {
        operation: ApiOperation::GuestChat,
        message: "connection refused".to_string(),
    }
}

pub(crate) fn settings_payload(
    name: &str,
    greeting: Option<&str>,
    prompts: Option<Vec<&str>>,
) -> ChatbotSettingsPayload {
    ChatbotSettingsPayload {
        chatbot_name: name.to_string(),
        greeting_message_en: greeting.map(ToString::to_string),
        greeting_message_ar: None,
        suggested_questions_en: prompts
            .map(|items| items.into_iter().map(ToString::to_string).collect()),
        suggested_questions_ar: None,
    }
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not reached while yielding to spawned tasks");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
