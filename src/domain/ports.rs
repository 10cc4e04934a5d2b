use async_trait::async_trait;

use crate::domain::model::ChatMessage;
use crate::domain::ticket::Snowflake;
use crate::utils::embeds::Embed;
use crate::utils::error::Result;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// The seam between relay logic and the chat platform.
///
/// A gateway implementation talks to the real API; tests use an in-memory
/// recording implementation.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message to a channel or thread. `content` is the plain-text
    /// part in front of the embed, used for role mentions.
    async fn send_to_channel(
        &self,
        channel: Snowflake,
        content: Option<String>,
        embed: Embed,
    ) -> Result<ChatMessage>;

    /// Send an embed to a user's direct messages.
    async fn send_dm(&self, user: Snowflake, embed: Embed) -> Result<ChatMessage>;

    /// Create a thread attached to an existing message, returning its id.
    async fn create_thread(&self, parent_message: Snowflake, name: String) -> Result<Snowflake>;

    /// Archive a thread, ending the conversation view for staff.
    async fn archive_thread(&self, thread: Snowflake) -> Result<()>;

    /// Whether the given thread has been archived.
    async fn is_thread_archived(&self, thread: Snowflake) -> Result<bool>;
}
