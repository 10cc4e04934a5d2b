use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::Snowflake;

/// A platform user as seen by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserRef {
    /// The `name#discriminator(id)` form used in staff-facing embed titles.
    pub fn tag(&self) -> String {
        format!("{}#{}({})", self.name, self.discriminator, self.id)
    }
}

/// An incoming or relayed chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Snowflake,
    pub author: UserRef,
    pub content: String,
    pub channel_id: Snowflake,
    /// None for direct messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn is_dm(&self) -> bool {
        self.guild_id.is_none()
    }
}
