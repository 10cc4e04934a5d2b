use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModmailConfig {
    pub bot: BotConfig,
    pub colors: ColorsConfig,
    pub channels: ChannelConfig,
    pub dev: DevConfig,
    pub emoji: EmojiConfig,
    pub mention: MentionConfig,
    pub snippets: SnippetConfig,
    pub thread: ThreadConfig,
    pub updates: UpdateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub prefix: String,
    pub activity: BotActivityConfig,
    pub token: Option<String>,
    pub modmail_guild_id: Option<String>,
    pub guild_id: Option<String>,
    pub multi_bot: bool,
    pub log_url: Option<String>,
    pub log_url_prefix: String,
    pub github_token: Option<String>,
    pub enable_plugins: bool,
    pub enable_eval: bool,
    pub data_collection: bool,
    pub owners: Option<String>,
    pub connection_uri: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "?".to_string(),
            activity: BotActivityConfig::default(),
            token: None,
            modmail_guild_id: None,
            guild_id: None,
            multi_bot: false,
            log_url: None,
            log_url_prefix: "/".to_string(),
            github_token: None,
            enable_plugins: true,
            enable_eval: true,
            data_collection: true,
            owners: None,
            connection_uri: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotActivityConfig {
    pub twitch_url: String,
}

impl Default for BotActivityConfig {
    fn default() -> Self {
        Self {
            twitch_url: "https://www.twitch.tv/discordmodmail/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub main_color: u32,
    pub error_color: u32,
    pub recipient_color: u32,
    pub mod_color: u32,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            main_color: 0x5865F2,
            error_color: 0xE74C3C,
            recipient_color: 0x2ECC71,
            mod_color: 0x3498DB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChannelConfig {
    pub main_category: Option<String>,
    pub fallback_category: Option<String>,
    pub log_channel: Option<String>,
    pub mention_channel: Option<String>,
    pub update_channel: Option<String>,
}

/// Which run modes the bot should load extensions for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotModeConfig {
    pub production: bool,
    pub develop: bool,
    pub plugin_dev: bool,
}

impl Default for BotModeConfig {
    fn default() -> Self {
        Self {
            production: true,
            develop: false,
            plugin_dev: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevConfig {
    pub log_level: String,
    pub mode: BotModeConfig,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            mode: BotModeConfig::default(),
        }
    }
}

/// Fallback emojis used when no use-specific emoji is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmojiConfig {
    pub sent_emoji: String,
    pub blocked_emoji: String,
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self {
            sent_emoji: "✅".to_string(),
            blocked_emoji: "🚫".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MentionConfig {
    pub alert_on_mention: bool,
    pub silent_alert_on_mention: bool,
    pub mention_channel: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SnippetConfig {
    pub anonymous_snippets: bool,
    pub use_regex_autotrigger: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadAnonConfig {
    pub username: String,
    pub footer: String,
}

impl Default for ThreadAnonConfig {
    fn default() -> Self {
        Self {
            username: "Response".to_string(),
            footer: "Staff Team".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadAutoCloseConfig {
    pub time_seconds: u64,
    pub silently: bool,
    pub response: String,
}

impl Default for ThreadAutoCloseConfig {
    fn default() -> Self {
        Self {
            time_seconds: 0,
            silently: false,
            response: "This thread has been closed automatically due to inactivity after {timeout}."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadCloseConfig {
    pub footer: String,
    pub title: String,
    pub response: String,
    pub on_leave: bool,
    pub on_leave_reason: String,
    pub self_close_response: String,
}

impl Default for ThreadCloseConfig {
    fn default() -> Self {
        Self {
            footer: "Replying will create a new thread".to_string(),
            title: "Thread Closed".to_string(),
            response: "{closer} has closed this Modmail thread.".to_string(),
            on_leave: false,
            on_leave_reason: "The recipient has left the server.".to_string(),
            self_close_response: "You have closed this Modmail thread.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfirmCreationConfig {
    pub enabled: bool,
    pub title: String,
    pub response: String,
    pub accept_emoji: String,
    pub deny_emoji: String,
}

impl Default for ThreadConfirmCreationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            title: "Confirm thread creation".to_string(),
            response: "React to confirm thread creation which will directly contact the moderators"
                .to_string(),
            accept_emoji: "✅".to_string(),
            deny_emoji: "🚫".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadCooldownConfig {
    pub time_seconds: u64,
    pub embed_title: String,
    pub response: String,
}

impl Default for ThreadCooldownConfig {
    fn default() -> Self {
        Self {
            time_seconds: 0,
            embed_title: "Message not sent!".to_string(),
            response: "You must wait for {delta} before you can contact me again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadCreationConfig {
    pub response: String,
    pub footer: String,
    pub title: String,
}

impl Default for ThreadCreationConfig {
    fn default() -> Self {
        Self {
            response: "The staff team will get back to you as soon as possible.".to_string(),
            footer: "Your message has been sent".to_string(),
            title: "Thread Created".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadDisabledConfig {
    pub new_title: String,
    pub new_response: String,
    pub new_footer: String,
    pub current_title: String,
    pub current_response: String,
    pub current_footer: String,
}

impl Default for ThreadDisabledConfig {
    fn default() -> Self {
        Self {
            new_title: "Not Delivered".to_string(),
            new_response: "We are not accepting new threads.".to_string(),
            new_footer: "Please try again later...".to_string(),
            current_title: "Not Delivered".to_string(),
            current_response: "We are not accepting any messages.".to_string(),
            current_footer: "Please try again later...".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadMoveConfig {
    pub title: String,
    pub notify: bool,
    pub notify_mods: bool,
    pub response: String,
}

impl Default for ThreadMoveConfig {
    fn default() -> Self {
        Self {
            title: "Thread Moved".to_string(),
            notify: false,
            notify_mods: false,
            response: "This thread has been moved.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSelfClosableConfig {
    pub enabled: bool,
    pub lock_emoji: String,
    pub creation_footer: String,
}

impl Default for ThreadSelfClosableConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lock_emoji: "🔒".to_string(),
            creation_footer: "Click the lock to close the thread".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    pub anon_reply_without_command: bool,
    pub reply_without_command: bool,
    pub plain_reply_without_command: bool,
    pub mention: String,
    pub user_typing: bool,
    pub mod_typing: bool,
    pub transfer_reactions: bool,
    pub contact_silently: bool,
    pub account_age_seconds: u64,
    pub guild_age_seconds: u64,
    pub mod_tag: String,
    pub show_timestamp: bool,

    pub anon: ThreadAnonConfig,
    pub auto_close: ThreadAutoCloseConfig,
    pub close: ThreadCloseConfig,
    pub confirm_creation: ThreadConfirmCreationConfig,
    pub cooldown: ThreadCooldownConfig,
    pub creation: ThreadCreationConfig,
    pub disabled: ThreadDisabledConfig,
    #[serde(rename = "move")]
    pub move_: ThreadMoveConfig,
    pub self_closable: ThreadSelfClosableConfig,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            anon_reply_without_command: false,
            reply_without_command: false,
            plain_reply_without_command: false,
            mention: "@here".to_string(),
            user_typing: false,
            mod_typing: false,
            transfer_reactions: true,
            contact_silently: false,
            account_age_seconds: 0,
            guild_age_seconds: 0,
            mod_tag: String::new(),
            show_timestamp: true,
            anon: ThreadAnonConfig::default(),
            auto_close: ThreadAutoCloseConfig::default(),
            close: ThreadCloseConfig::default(),
            confirm_creation: ThreadConfirmCreationConfig::default(),
            cooldown: ThreadCooldownConfig::default(),
            creation: ThreadCreationConfig::default(),
            disabled: ThreadDisabledConfig::default(),
            move_: ThreadMoveConfig::default(),
            self_closable: ThreadSelfClosableConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    pub disable_autoupdates: bool,
    pub update_notifications: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            disable_autoupdates: false,
            update_notifications: true,
        }
    }
}

/// Mutable runtime state the bot manages itself. Never set these by hand.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InternalConfig {
    pub activity_message: Option<String>,
    pub dm_disabled: u8,
    pub blocked: HashMap<String, String>,
    pub snippets: HashMap<String, String>,
    pub aliases: HashMap<String, String>,
    pub notifications: HashMap<String, Vec<String>>,
    pub closures: HashMap<String, String>,
    pub plugins: Vec<String>,
}

impl ModmailConfig {
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("bot.prefix", &self.bot.prefix)?;
        validation::validate_url("bot.activity.twitch_url", &self.bot.activity.twitch_url)?;

        if let Some(log_url) = &self.bot.log_url {
            validation::validate_url("bot.log_url", log_url)?;
        }

        validation::validate_non_empty_string("thread.mention", &self.thread.mention)?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.dev.log_level.as_str()) {
            return Err(crate::utils::error::ModmailError::InvalidConfigValueError {
                field: "dev.log_level".to_string(),
                value: self.dev.log_level.clone(),
                reason: format!("Unsupported level. Valid levels: {}", valid_levels.join(", ")),
            });
        }

        Ok(())
    }
}

impl Validate for ModmailConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
