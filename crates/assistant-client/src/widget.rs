use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::api::ChatApiClient;
use crate::backend::{AdminBackend, AssistantBackend, GuestBackend};
use crate::config::AssistantClientConfig;
use crate::conversation::Message;
use crate::dispatch::{
    ChatState, DispatchError, DispatchReceipt, MessageDispatcher, SharedChat, lock_chat,
};
use crate::feedback::{FeedbackError, FeedbackRecorder};
use crate::quick_question::{DEFAULT_QUICK_QUESTION_DELAY, QuickQuestionFlow};
use crate::session::SessionIdentity;
use crate::settings::{
    AssistantSettings, AssistantVariant, GuestIdentity, Language, SettingsFallback, SettingsLoader,
};

// Quick questions are onboarding hints: shown only while the conversation
// holds at most the greeting and one exchange.
const QUICK_QUESTION_MAX_MESSAGES: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WidgetPhase {
    #[default]
    Closed,
    Open,
    Minimized,
}

impl WidgetPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Minimized => "minimized",
        }
    }

    pub fn apply(self, event: WidgetEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (Self::Closed, WidgetEvent::Open) => Ok(Self::Open),
            (Self::Open, WidgetEvent::Minimize) => Ok(Self::Minimized),
            (Self::Minimized, WidgetEvent::Restore) => Ok(Self::Open),
            (Self::Open | Self::Minimized, WidgetEvent::Close) => Ok(Self::Closed),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl fmt::Display for WidgetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    Open,
    Minimize,
    Restore,
    Close,
}

impl WidgetEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Minimize => "minimize",
            Self::Restore => "restore",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for WidgetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {event} the assistant while it is {from}")]
pub struct TransitionError {
    pub from: WidgetPhase,
    pub event: WidgetEvent,
}

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    // The widget is open; the greeting came from default settings.
    #[error(transparent)]
    SettingsFallback(#[from] SettingsFallback),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetOptions {
    pub language: Language,
    pub quick_question_delay: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            language: Language::En,
            quick_question_delay: DEFAULT_QUICK_QUESTION_DELAY,
        }
    }
}

impl WidgetOptions {
    pub fn from_config(config: &AssistantClientConfig) -> Self {
        Self {
            language: config.language,
            quick_question_delay: config.quick_question_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub phase: WidgetPhase,
    pub display_name: String,
    pub messages: Vec<Message>,
    pub sending: bool,
    pub input_enabled: bool,
    pub draft: String,
    pub quick_questions: Vec<String>,
}

#[derive(Clone)]
pub struct AssistantWidget {
    variant: AssistantVariant,
    guest: GuestIdentity,
    backend: Arc<dyn AssistantBackend>,
    state: SharedChat,
    phase: Arc<Mutex<WidgetPhase>>,
    settings_loader: SettingsLoader,
    dispatcher: MessageDispatcher,
    feedback: FeedbackRecorder,
    quick_questions: QuickQuestionFlow,
}

impl AssistantWidget {
    pub fn guest(client: ChatApiClient, guest: GuestIdentity, options: WidgetOptions) -> Self {
        Self::with_backend(
            Arc::new(GuestBackend::new(client)),
            AssistantVariant::Guest,
            guest,
            options,
        )
    }

    pub fn admin(
        client: ChatApiClient,
        wedding_id: Option<String>,
        guest_token: Option<String>,
        options: WidgetOptions,
    ) -> Self {
        Self::with_backend(
            Arc::new(AdminBackend::new(client, wedding_id)),
            AssistantVariant::Admin,
            GuestIdentity::new(guest_token.unwrap_or_default(), None),
            options,
        )
    }

    pub fn with_backend(
        backend: Arc<dyn AssistantBackend>,
        variant: AssistantVariant,
        guest: GuestIdentity,
        options: WidgetOptions,
    ) -> Self {
        let state: SharedChat = Arc::new(Mutex::new(ChatState::default()));
        let session = SessionIdentity::create();
        let dispatcher = MessageDispatcher::new(
            backend.clone(),
            state.clone(),
            session,
            guest.token.clone(),
            options.language,
            variant.fallback_reply(),
        );
        let feedback = FeedbackRecorder::new(backend.clone(), state.clone());
        let quick_questions =
            QuickQuestionFlow::new(dispatcher.clone(), options.quick_question_delay);

        Self {
            variant,
            guest,
            backend,
            state,
            phase: Arc::new(Mutex::new(WidgetPhase::Closed)),
            settings_loader: SettingsLoader::new(variant, options.language),
            dispatcher,
            feedback,
            quick_questions,
        }
    }

    pub fn variant(&self) -> AssistantVariant {
        self.variant
    }

    pub fn guest_identity(&self) -> &GuestIdentity {
        &self.guest
    }

    pub fn session(&self) -> &SessionIdentity {
        self.dispatcher.session()
    }

    pub fn session_id(&self) -> &str {
        self.dispatcher.session().session_id()
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    pub fn feedback_recorder(&self) -> &FeedbackRecorder {
        &self.feedback
    }

    pub fn quick_question_flow(&self) -> &QuickQuestionFlow {
        &self.quick_questions
    }

    pub fn phase(&self) -> WidgetPhase {
        *self.lock_phase()
    }

    // Settings are fetched at most once per guest; the greeting is seeded
    // only into an empty conversation, so reopening never duplicates it.
    // Input stays refused until the greeting is in place.
    pub async fn open(&self) -> Result<(), WidgetError> {
        self.transition(WidgetEvent::Open)?;

        let (settings, fallback) = match self
            .settings_loader
            .load(&*self.backend, &self.guest)
            .await
        {
            Ok(settings) => (settings, None),
            Err(fallback) => (fallback.settings.clone(), Some(fallback)),
        };

        let seeded = {
            let phase = self.lock_phase();
            let mut chat = lock_chat(&self.state);
            let seeded = chat.conversation.seed_greeting(settings.greeting_text);
            chat.sync_input(*phase == WidgetPhase::Open);
            seeded
        };
        if seeded {
            debug!(session_id = %self.session_id(), "assistant greeting seeded");
        }

        match fallback {
            Some(fallback) => Err(WidgetError::SettingsFallback(fallback)),
            None => Ok(()),
        }
    }

    pub fn minimize(&self) -> Result<WidgetPhase, TransitionError> {
        self.transition(WidgetEvent::Minimize)
    }

    pub fn restore(&self) -> Result<WidgetPhase, TransitionError> {
        self.transition(WidgetEvent::Restore)
    }

    pub fn toggle_minimized(&self) -> Result<WidgetPhase, TransitionError> {
        match self.phase() {
            WidgetPhase::Minimized => self.transition(WidgetEvent::Restore),
            _ => self.transition(WidgetEvent::Minimize),
        }
    }

    // Closing keeps the conversation and session and does not cancel an
    // in-flight dispatch.
    pub fn close(&self) -> Result<WidgetPhase, TransitionError> {
        self.transition(WidgetEvent::Close)
    }

    pub async fn send(&self, text: &str) -> Result<DispatchReceipt, DispatchError> {
        self.dispatcher.send(text).await
    }

    pub async fn submit_draft(&self) -> Result<DispatchReceipt, DispatchError> {
        let draft = self.draft();
        self.dispatcher.send(&draft).await
    }

    pub fn set_draft(&self, text: &str) -> Result<(), DispatchError> {
        let mut chat = lock_chat(&self.state);
        if !chat.accepting_input {
            return Err(DispatchError::NotOpen);
        }
        if chat.guard.is_sending() {
            return Err(DispatchError::AlreadySending);
        }
        chat.draft = text.to_string();
        Ok(())
    }

    pub fn draft(&self) -> String {
        lock_chat(&self.state).draft.clone()
    }

    pub async fn select_quick_question(
        &self,
        prompt: &str,
    ) -> Result<DispatchReceipt, DispatchError> {
        self.quick_questions.select(prompt).await
    }

    pub async fn record_feedback(&self, index: usize, helpful: bool) -> Result<(), FeedbackError> {
        self.feedback.record(index, helpful).await
    }

    pub fn messages(&self) -> Vec<Message> {
        lock_chat(&self.state).conversation.all().to_vec()
    }

    pub fn is_sending(&self) -> bool {
        self.dispatcher.is_sending()
    }

    pub fn input_enabled(&self) -> bool {
        lock_chat(&self.state).input_enabled()
    }

    pub fn settings(&self) -> Option<AssistantSettings> {
        self.settings_loader.cached(&self.guest.token)
    }

    pub fn display_name(&self) -> String {
        self.settings()
            .map(|settings| settings.display_name)
            .unwrap_or_else(|| self.variant.default_display_name().to_string())
    }

    pub fn quick_questions(&self) -> Vec<String> {
        if self.phase() != WidgetPhase::Open {
            return Vec::new();
        }
        if lock_chat(&self.state).conversation.len() > QUICK_QUESTION_MAX_MESSAGES {
            return Vec::new();
        }
        self.settings()
            .map(|settings| settings.suggested_prompts)
            .unwrap_or_default()
    }

    pub fn view(&self) -> WidgetView {
        let quick_questions = self.quick_questions();
        let display_name = self.display_name();
        let phase = self.phase();
        let chat = lock_chat(&self.state);
        let sending = chat.guard.is_sending();

        WidgetView {
            phase,
            display_name,
            messages: chat.conversation.all().to_vec(),
            sending,
            input_enabled: chat.input_enabled(),
            draft: chat.draft.clone(),
            quick_questions,
        }
    }

    fn transition(&self, event: WidgetEvent) -> Result<WidgetPhase, TransitionError> {
        let mut phase = self.lock_phase();
        let from = *phase;
        let to = from.apply(event)?;
        *phase = to;
        lock_chat(&self.state).sync_input(to == WidgetPhase::Open);
        drop(phase);

        if event == WidgetEvent::Open {
            info!(
                session_id = %self.session_id(),
                variant = self.variant.as_str(),
                "assistant opened"
            );
        } else {
            debug!(session_id = %self.session_id(), %from, %to, "assistant transition");
        }
        Ok(to)
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, WidgetPhase> {
        match self.phase.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
