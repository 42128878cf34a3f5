use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::ChatApiError;
use crate::backend::{AssistantBackend, ChatTurn};
use crate::conversation::{ConversationStore, Message};
use crate::session::SessionIdentity;
use crate::settings::Language;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("the assistant is not open")]
    NotOpen,
    #[error("a message is already being sent")]
    AlreadySending,
    #[error("assistant request failed, fallback reply stored at index {fallback_index}: {source}")]
    Remote {
        fallback_index: usize,
        #[source]
        source: ChatApiError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub user_index: usize,
    pub assistant_index: usize,
    pub log_id: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DispatchPhase {
    #[default]
    Idle,
    Sending {
        dispatch_id: Uuid,
    },
}

#[derive(Debug, Default)]
pub(crate) struct DispatchGuard {
    phase: DispatchPhase,
}

impl DispatchGuard {
    fn try_begin(&mut self) -> Result<Uuid, DispatchError> {
        match self.phase {
            DispatchPhase::Sending { .. } => Err(DispatchError::AlreadySending),
            DispatchPhase::Idle => {
                let dispatch_id = Uuid::new_v4();
                self.phase = DispatchPhase::Sending { dispatch_id };
                Ok(dispatch_id)
            }
        }
    }

    fn finish(&mut self, dispatch_id: Uuid) -> bool {
        match self.phase {
            DispatchPhase::Sending { dispatch_id: active } if active == dispatch_id => {
                self.phase = DispatchPhase::Idle;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_sending(&self) -> bool {
        matches!(self.phase, DispatchPhase::Sending { .. })
    }
}

#[derive(Debug, Default)]
pub(crate) struct ChatState {
    pub(crate) conversation: ConversationStore,
    pub(crate) guard: DispatchGuard,
    pub(crate) draft: String,
    // Set only while the widget is open and the greeting has been seeded.
    pub(crate) accepting_input: bool,
}

impl ChatState {
    pub(crate) fn sync_input(&mut self, open: bool) {
        self.accepting_input = open && !self.conversation.is_empty();
    }

    pub(crate) fn input_enabled(&self) -> bool {
        self.accepting_input && !self.guard.is_sending()
    }
}

pub(crate) type SharedChat = Arc<Mutex<ChatState>>;

pub(crate) fn lock_chat(state: &Mutex<ChatState>) -> MutexGuard<'_, ChatState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// Holds the single send slot; dropping it returns the guard to idle.
pub(crate) struct SendingSlot {
    state: SharedChat,
    dispatch_id: Uuid,
}

impl SendingSlot {
    pub(crate) fn dispatch_id(&self) -> Uuid {
        self.dispatch_id
    }
}

impl Drop for SendingSlot {
    fn drop(&mut self) {
        lock_chat(&self.state).guard.finish(self.dispatch_id);
    }
}

pub(crate) fn normalize_message(text: &str) -> Result<String, DispatchError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DispatchError::EmptyMessage);
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct MessageDispatcher {
    backend: Arc<dyn AssistantBackend>,
    state: SharedChat,
    session: SessionIdentity,
    guest_token: String,
    language: Language,
    fallback_reply: String,
}

impl MessageDispatcher {
    pub(crate) fn new(
        backend: Arc<dyn AssistantBackend>,
        state: SharedChat,
        session: SessionIdentity,
        guest_token: String,
        language: Language,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            state,
            session,
            guest_token,
            language,
            fallback_reply: fallback_reply.into(),
        }
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    pub fn is_sending(&self) -> bool {
        lock_chat(&self.state).guard.is_sending()
    }

    pub async fn send(&self, user_text: &str) -> Result<DispatchReceipt, DispatchError> {
        let message = normalize_message(user_text)?;
        let slot = self.reserve()?;
        self.dispatch_reserved(slot, message).await
    }

    pub(crate) fn stage_draft(&self, text: &str) {
        lock_chat(&self.state).draft = text.to_string();
    }

    pub(crate) fn reserve(&self) -> Result<SendingSlot, DispatchError> {
        let mut chat = lock_chat(&self.state);
        if !chat.accepting_input {
            return Err(DispatchError::NotOpen);
        }
        let dispatch_id = chat.guard.try_begin()?;
        drop(chat);
        Ok(SendingSlot {
            state: self.state.clone(),
            dispatch_id,
        })
    }

    pub(crate) async fn dispatch_reserved(
        &self,
        slot: SendingSlot,
        message: String,
    ) -> Result<DispatchReceipt, DispatchError> {
        let (user_index, turn) = {
            let mut chat = lock_chat(&self.state);
            let conversation_history = chat.conversation.sendable_history();
            let user_index = chat.conversation.append(Message::user(message.clone()));
            chat.draft.clear();
            (
                user_index,
                ChatTurn {
                    guest_token: self.guest_token.clone(),
                    message,
                    session_id: self.session.session_id().to_string(),
                    language: self.language,
                    conversation_history,
                },
            )
        };

        debug!(
            session_id = %self.session.session_id(),
            dispatch_id = %slot.dispatch_id(),
            history_len = turn.conversation_history.len(),
            "dispatching assistant message"
        );

        let result = self.backend.send_turn(turn).await;

        let outcome = {
            let mut chat = lock_chat(&self.state);
            match result {
                Ok(reply) => {
                    let assistant_index = chat
                        .conversation
                        .append(Message::assistant_reply(reply.text, reply.log_id.clone()));
                    Ok(DispatchReceipt {
                        user_index,
                        assistant_index,
                        log_id: reply.log_id,
                        topic: reply.topic,
                    })
                }
                Err(source) => {
                    let fallback_index = chat
                        .conversation
                        .append(Message::assistant(self.fallback_reply.clone()));
                    Err(DispatchError::Remote {
                        fallback_index,
                        source,
                    })
                }
            }
        };

        match &outcome {
            Ok(receipt) => debug!(
                session_id = %self.session.session_id(),
                dispatch_id = %slot.dispatch_id(),
                log_id = receipt.log_id.as_deref().unwrap_or("none"),
                "assistant reply committed"
            ),
            Err(err) => warn!(
                session_id = %self.session.session_id(),
                dispatch_id = %slot.dispatch_id(),
                "assistant request failed, stored fallback reply: {err}"
            ),
        }

        drop(slot);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{ChatState, DispatchError, MessageDispatcher, SharedChat, lock_chat};
    use crate::backend::AssistantBackend;
    use crate::conversation::{HistoryItem, Role};
    use crate::session::SessionIdentity;
    use crate::settings::Language;
    use crate::test_support::{ScriptedBackend, reply, transport_error, wait_until};

    const FALLBACK: &str = "I'm sorry, I'm having trouble connecting. Please try again.";

    fn dispatcher_with(backend: Arc<ScriptedBackend>) -> (MessageDispatcher, SharedChat) {
        let state: SharedChat = Arc::new(Mutex::new(ChatState::default()));
        {
            let mut chat = lock_chat(&state);
            chat.conversation.seed_greeting("Hi there!");
            chat.sync_input(true);
        }
        let backend: Arc<dyn AssistantBackend> = backend;
        let dispatcher = MessageDispatcher::new(
            backend,
            state.clone(),
            SessionIdentity::create(),
            "guest-token".to_string(),
            Language::En,
            FALLBACK,
        );
        (dispatcher, state)
    }

    #[tokio::test]
    async fn history_snapshot_excludes_the_new_user_message() {
        let backend = Arc::new(ScriptedBackend::new().with_reply(reply("Ceremony at 4pm", Some("L1"))));
        let (dispatcher, state) = dispatcher_with(backend.clone());

        let receipt = dispatcher
            .send("  What's the schedule?  ")
            .await
            .expect("send should succeed");

        let turns = backend.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, "What's the schedule?");
        assert_eq!(turns[0].guest_token, "guest-token");
        assert_eq!(turns[0].session_id, dispatcher.session().session_id());
        assert_eq!(
            turns[0].conversation_history,
            vec![HistoryItem {
                role: Role::Assistant,
                content: "Hi there!".to_string()
            }]
        );

        assert_eq!(receipt.user_index, 1);
        assert_eq!(receipt.assistant_index, 2);
        assert_eq!(receipt.log_id.as_deref(), Some("L1"));

        let chat = lock_chat(&state);
        let messages = chat.conversation.all();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "Ceremony at 4pm");
        assert_eq!(messages[2].log_id(), Some("L1"));
        assert!(!chat.guard.is_sending());
    }

    #[tokio::test]
    async fn each_completed_send_appends_exactly_two_messages() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply(reply("one", Some("L1")))
                .with_reply(Err(transport_error()))
                .with_reply(reply("three", None)),
        );
        let (dispatcher, state) = dispatcher_with(backend.clone());

        for (round, text) in ["first", "second", "third"].iter().enumerate() {
            let before = lock_chat(&state).conversation.len();
            let _ = dispatcher.send(text).await;
            let chat = lock_chat(&state);
            assert_eq!(chat.conversation.len(), before + 2, "round {round}");
            assert_eq!(chat.conversation.all()[before].role, Role::User);
            assert_eq!(chat.conversation.all()[before + 1].role, Role::Assistant);
        }

        let history = &backend.turns()[2].conversation_history;
        assert_eq!(history.len(), 5);
        assert_eq!(history[4].content, FALLBACK);
    }

    #[tokio::test]
    async fn failure_stores_fallback_without_log_id_and_releases_guard() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_reply(Err(transport_error()))
                .with_reply(reply("recovered", Some("L2"))),
        );
        let (dispatcher, state) = dispatcher_with(backend.clone());

        let err = dispatcher
            .send("Where is the venue?")
            .await
            .expect_err("transport failure should surface");
        assert!(matches!(err, DispatchError::Remote { fallback_index: 2, .. }));

        {
            let chat = lock_chat(&state);
            let fallback = &chat.conversation.all()[2];
            assert_eq!(fallback.role, Role::Assistant);
            assert_eq!(fallback.content, FALLBACK);
            assert_eq!(fallback.log_id(), None);
            assert!(!chat.guard.is_sending());
        }

        let receipt = dispatcher
            .send("Where is the venue?")
            .await
            .expect("subsequent send should go through");
        assert_eq!(receipt.assistant_index, 4);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_side_effects() {
        let backend = Arc::new(ScriptedBackend::new());
        let (dispatcher, state) = dispatcher_with(backend.clone());

        let err = dispatcher.send("   \n\t").await.expect_err("blank text");
        assert!(matches!(err, DispatchError::EmptyMessage));
        assert_eq!(lock_chat(&state).conversation.len(), 1);
        assert!(backend.turns().is_empty());
    }

    #[tokio::test]
    async fn send_is_refused_until_input_is_accepted() {
        let backend = Arc::new(ScriptedBackend::new().with_reply(reply("4pm", Some("L1"))));
        let (dispatcher, state) = dispatcher_with(backend.clone());
        lock_chat(&state).sync_input(false);

        let err = dispatcher
            .send("What's the schedule?")
            .await
            .expect_err("closed widget should refuse");
        assert!(matches!(err, DispatchError::NotOpen));
        assert_eq!(lock_chat(&state).conversation.len(), 1);
        assert!(!dispatcher.is_sending());
        assert!(backend.turns().is_empty());

        let empty_store: SharedChat = Arc::new(Mutex::new(ChatState::default()));
        let mut chat = lock_chat(&empty_store);
        chat.sync_input(true);
        assert!(!chat.input_enabled(), "no greeting yet");
    }

    #[tokio::test]
    async fn send_while_in_flight_is_ignored() {
        let (backend, gate) = ScriptedBackend::new()
            .with_reply(reply("first answer", Some("L1")))
            .gated();
        let backend = Arc::new(backend);
        let (dispatcher, state) = dispatcher_with(backend.clone());

        let in_flight = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.send("first").await })
        };
        wait_until(|| backend.turns().len() == 1).await;
        assert!(dispatcher.is_sending());

        let err = dispatcher
            .send("second")
            .await
            .expect_err("concurrent send should be rejected");
        assert!(matches!(err, DispatchError::AlreadySending));
        assert_eq!(lock_chat(&state).conversation.len(), 2);
        assert_eq!(backend.turns().len(), 1);

        gate.add_permits(1);
        let receipt = in_flight
            .await
            .expect("task should join")
            .expect("first send should succeed");
        assert_eq!(receipt.assistant_index, 2);
        assert!(!dispatcher.is_sending());
    }

    #[tokio::test]
    async fn cancelled_dispatch_still_releases_the_guard() {
        let (backend, _gate) = ScriptedBackend::new().gated();
        let backend = Arc::new(backend);
        let (dispatcher, _state) = dispatcher_with(backend.clone());

        let in_flight = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.send("never answered").await })
        };
        wait_until(|| backend.turns().len() == 1).await;
        in_flight.abort();
        let _ = in_flight.await;

        assert!(!dispatcher.is_sending());
    }
}
