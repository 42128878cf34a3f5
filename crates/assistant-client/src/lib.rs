pub mod api;
pub mod backend;
pub mod config;
mod config_env;
pub mod conversation;
pub mod dispatch;
pub mod feedback;
pub mod quick_question;
pub mod session;
pub mod settings;
pub mod widget;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ChatApiClient, ChatApiError};
pub use backend::{AdminBackend, AssistantBackend, AssistantReply, ChatTurn, GuestBackend};
pub use config::{AssistantClientConfig, ConfigError};
pub use conversation::{ConversationStore, Feedback, HistoryItem, Message, Role};
pub use dispatch::{DispatchError, DispatchReceipt, MessageDispatcher};
pub use feedback::{FeedbackError, FeedbackRecorder};
pub use quick_question::QuickQuestionFlow;
pub use session::SessionIdentity;
pub use settings::{
    AssistantSettings, AssistantVariant, GuestIdentity, Language, SettingsFallback, SettingsLoader,
};
pub use widget::{
    AssistantWidget, TransitionError, WidgetError, WidgetEvent, WidgetOptions, WidgetPhase,
    WidgetView,
};
