//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default HTTP port (Bot Framework emulator convention).
pub const DEFAULT_PORT: u16 = 3978;

/// Default cancel keyword.
pub const DEFAULT_CANCEL_KEYWORD: &str = "отмена";

/// User-facing texts sent by the conversation controller.
#[derive(Debug, Clone)]
pub struct BotMessages {
    /// Greeting template; `{name}` is replaced with the member's display name.
    pub welcome: String,
    /// Sent after a cancel unwinds an active dialog.
    pub cancelled: String,
    /// Sent when the cancel keyword arrives with nothing on the stack.
    pub nothing_to_cancel: String,
    /// The single reply for any internal failure.
    pub apology: String,
}

impl Default for BotMessages {
    fn default() -> Self {
        Self {
            welcome: "Привет {name}. Я - робот, который поможет Вам сделать заказ. \
                      Напишите что-нибудь, если хотите продолжить. \
                      Напишите 'отмена', что бы начать с начала."
                .to_string(),
            cancelled: "Хорошо... отмена.".to_string(),
            nothing_to_cancel: "Нечего отменять :)".to_string(),
            apology: "Ой. Что-то пошло не так!".to_string(),
        }
    }
}

impl BotMessages {
    /// Render the welcome text for a member.
    pub fn welcome_for(&self, name: &str) -> String {
        self.welcome.replace("{name}", name)
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// HTTP listen port.
    pub port: u16,
    /// libSQL database path. `None` keeps state in memory.
    pub db_path: Option<PathBuf>,
    /// Keyword that unwinds the whole dialog stack (matched trimmed, case-insensitive).
    pub cancel_keyword: String,
    /// Whether to run the stdin/stdout REPL alongside the HTTP server.
    pub cli_enabled: bool,
    /// The bot's own account id, never greeted on `membersAdded`.
    pub bot_id: String,
    /// User-facing texts.
    pub messages: BotMessages,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: None,
            cancel_keyword: DEFAULT_CANCEL_KEYWORD.to_string(),
            cli_enabled: false,
            bot_id: "bot".to_string(),
            messages: BotMessages::default(),
        }
    }
}

impl BotConfig {
    /// Build the config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            Err(_) => defaults.port,
        };

        let db_path = std::env::var("BOT_DB_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cancel_keyword = std::env::var("BOT_CANCEL_KEYWORD")
            .ok()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.cancel_keyword);

        let cli_enabled = std::env::var("BOT_CLI")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.cli_enabled);

        let bot_id = std::env::var("BOT_ID")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.bot_id);

        Ok(Self {
            port,
            db_path,
            cancel_keyword,
            cli_enabled,
            bot_id,
            messages: defaults.messages,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
