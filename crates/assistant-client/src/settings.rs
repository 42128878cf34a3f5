use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ChatApiError, ChatbotSettingsPayload};
use crate::backend::AssistantBackend;

pub const DEFAULT_DISPLAY_NAME: &str = "Rada";

const GUEST_PROMPTS_EN: [&str; 4] = [
    "What's the schedule?",
    "Where is the venue?",
    "How do I RSVP?",
    "Hotel recommendations?",
];
const GUEST_PROMPTS_AR: [&str; 4] = [
    "ما هو الجدول الزمني؟",
    "أين مكان الحفل؟",
    "كيف أؤكد حضوري؟",
    "توصيات الفنادق؟",
];
const GUEST_GREETING_AR: &str =
    "مرحباً! أنا رادا، مساعدة الزفاف الخاصة بك. كيف يمكنني مساعدتك اليوم؟";
const GUEST_FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble connecting. Please try again.";

const ADMIN_DISPLAY_NAME: &str = "Wedding Assistant";
const ADMIN_GREETING: &str = "Hello! I'm your wedding assistant. I can help you with RSVPs, travel info, dress codes, activities, or any other questions. How can I assist you today?";
const ADMIN_PROMPTS: [&str; 4] = [
    "How do I RSVP?",
    "What's the dress code?",
    "Tell me about activities",
    "Hotel recommendations",
];
const ADMIN_FALLBACK_REPLY: &str = "I'm sorry, I'm having trouble connecting. Please try again or contact the wedding organizers.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "ar" => Some(Self::Ar),
            _ => None,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantVariant {
    Guest,
    Admin,
}

impl AssistantVariant {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Admin => "admin",
        }
    }

    pub fn default_display_name(self) -> &'static str {
        match self {
            Self::Guest => DEFAULT_DISPLAY_NAME,
            Self::Admin => ADMIN_DISPLAY_NAME,
        }
    }

    pub fn default_greeting(
        self,
        language: Language,
        guest_name: Option<&str>,
        display_name: &str,
    ) -> String {
        match (self, language) {
            (Self::Admin, _) => ADMIN_GREETING.to_string(),
            (Self::Guest, Language::Ar) => GUEST_GREETING_AR.to_string(),
            (Self::Guest, Language::En) => {
                let name_clause = guest_name
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| format!(" {name}"))
                    .unwrap_or_default();
                format!(
                    "Hello{name_clause}! I'm {display_name}, your wedding assistant. How can I help you today?"
                )
            }
        }
    }

    pub fn default_prompts(self, language: Language) -> Vec<String> {
        let prompts: &[&str] = match (self, language) {
            (Self::Admin, _) => &ADMIN_PROMPTS,
            (Self::Guest, Language::En) => &GUEST_PROMPTS_EN,
            (Self::Guest, Language::Ar) => &GUEST_PROMPTS_AR,
        };
        prompts.iter().map(|prompt| (*prompt).to_string()).collect()
    }

    pub fn fallback_reply(self) -> &'static str {
        match self {
            Self::Guest => GUEST_FALLBACK_REPLY,
            Self::Admin => ADMIN_FALLBACK_REPLY,
        }
    }

    pub fn default_settings(self, language: Language, guest_name: Option<&str>) -> AssistantSettings {
        let display_name = self.default_display_name().to_string();
        AssistantSettings {
            greeting_text: self.default_greeting(language, guest_name, &display_name),
            suggested_prompts: self.default_prompts(language),
            display_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestIdentity {
    pub token: String,
    pub display_name: Option<String>,
}

impl GuestIdentity {
    pub fn new(token: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
            display_name: display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    pub display_name: String,
    pub greeting_text: String,
    pub suggested_prompts: Vec<String>,
}

impl AssistantSettings {
    // Empty name and greeting fall back; an explicitly empty prompt list is honored.
    pub fn from_payload(
        payload: &ChatbotSettingsPayload,
        variant: AssistantVariant,
        language: Language,
        guest_name: Option<&str>,
    ) -> Self {
        let display_name = non_empty(&payload.chatbot_name)
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .to_string();

        let greeting_text = payload
            .greeting_for(language)
            .and_then(non_empty)
            .map(ToString::to_string)
            .unwrap_or_else(|| variant.default_greeting(language, guest_name, &display_name));

        let suggested_prompts = match payload.suggested_questions_for(language) {
            Some(questions) => questions.to_vec(),
            None => variant.default_prompts(language),
        };

        Self {
            display_name,
            greeting_text,
            suggested_prompts,
        }
    }
}

#[derive(Debug, Error)]
#[error("assistant settings unavailable, using defaults: {cause}")]
pub struct SettingsFallback {
    pub settings: AssistantSettings,
    #[source]
    pub cause: ChatApiError,
}

#[derive(Debug, Clone)]
struct CachedSettings {
    guest_token: String,
    settings: AssistantSettings,
}

#[derive(Clone)]
pub struct SettingsLoader {
    variant: AssistantVariant,
    language: Language,
    cache: Arc<Mutex<Option<CachedSettings>>>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SettingsLoader {
    pub fn new(variant: AssistantVariant, language: Language) -> Self {
        Self {
            variant,
            language,
            cache: Arc::new(Mutex::new(None)),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn cached(&self, guest_token: &str) -> Option<AssistantSettings> {
        self.lock_cache()
            .as_ref()
            .filter(|entry| entry.guest_token == guest_token)
            .map(|entry| entry.settings.clone())
    }

    pub fn invalidate(&self) {
        self.lock_cache().take();
    }

    pub async fn load(
        &self,
        backend: &dyn AssistantBackend,
        guest: &GuestIdentity,
    ) -> Result<AssistantSettings, SettingsFallback> {
        if let Some(settings) = self.cached(&guest.token) {
            return Ok(settings);
        }

        let _refresh_guard = self.refresh_lock.lock().await;
        if let Some(settings) = self.cached(&guest.token) {
            return Ok(settings);
        }

        let result = match backend.fetch_settings(&guest.token).await {
            Ok(Some(payload)) => Ok(AssistantSettings::from_payload(
                &payload,
                self.variant,
                self.language,
                guest.name(),
            )),
            Ok(None) => Ok(self.variant.default_settings(self.language, guest.name())),
            Err(cause) => {
                warn!(
                    variant = self.variant.as_str(),
                    "assistant settings fetch failed, using defaults: {cause}"
                );
                Err(SettingsFallback {
                    settings: self.variant.default_settings(self.language, guest.name()),
                    cause,
                })
            }
        };

        // Defaults are cached too so a failed fetch is not retried on reopen.
        let settings = match &result {
            Ok(settings) => settings.clone(),
            Err(fallback) => fallback.settings.clone(),
        };
        debug!(
            variant = self.variant.as_str(),
            display_name = %settings.display_name,
            "assistant settings resolved"
        );
        *self.lock_cache() = Some(CachedSettings {
            guest_token: guest.token.clone(),
            settings,
        });

        result
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<CachedSettings>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// Blank values count as missing; anything else is kept verbatim.
fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() { None } else { Some(value) }
}
