use std::sync::Arc;

use chrono::Utc;

use crate::config::ModmailConfig;
use crate::domain::model::{ChatMessage, UserRef};
use crate::domain::ports::Messenger;
use crate::domain::ticket::{Snowflake, Ticket, TicketRegistry};
use crate::utils::embeds::Embed;
use crate::utils::error::{ModmailError, Result};

/// Builds the embeds sent on ticket events, with all user-facing text
/// pulled from the thread section of the config.
pub struct TicketEmbeds {
    config: Arc<ModmailConfig>,
}

impl TicketEmbeds {
    pub fn new(config: Arc<ModmailConfig>) -> Self {
        Self { config }
    }

    /// Confirmation sent to the recipient when their first message opens
    /// a ticket.
    pub fn initial_to_user(&self) -> Embed {
        let creation = &self.config.thread.creation;
        Embed::new()
            .with_title(&creation.title)
            .with_description(&creation.response)
            .with_footer_text(&creation.footer)
            .with_color(self.config.colors.main_color)
            .with_timestamp(Utc::now())
    }

    /// The message posted in the relay channel announcing a new ticket.
    pub fn initial_to_guild(&self, message: &ChatMessage) -> Embed {
        Embed::new()
            .with_title(message.author.tag())
            .with_description(&message.content)
            .with_color(self.config.colors.recipient_color)
            .with_timestamp(message.timestamp)
    }

    /// A recipient message relayed into the staff thread.
    pub fn message_to_guild(&self, message: &ChatMessage) -> Embed {
        Embed::new()
            .with_title(message.author.tag())
            .with_description(&message.content)
            .with_footer_text(format!("Message ID: {}", message.id))
            .with_color(self.config.colors.recipient_color)
            .with_timestamp(message.timestamp)
    }

    /// A staff reply delivered to the recipient's direct messages. Anonymous
    /// replies are attributed to the configured stand-in identity instead of
    /// the staff member.
    pub fn message_to_user(&self, contents: &str, author: &UserRef, anonymous: bool) -> Embed {
        let footer = if anonymous {
            format!(
                "{} | {}",
                self.config.thread.anon.username, self.config.thread.anon.footer
            )
        } else {
            author.tag()
        };
        Embed::new()
            .with_description(contents)
            .with_color(self.config.colors.mod_color)
            .with_footer_text(footer)
            .with_timestamp(Utc::now())
    }

    /// Rebuild a previously relayed embed with edited contents, keeping the
    /// rest of the embed intact.
    pub fn edited_message(&self, original: &Embed, new_content: &str) -> Embed {
        let mut embed = original.clone();
        embed.description = Some(new_content.to_string());
        embed
    }

    pub fn close_to_thread(&self, closer: &UserRef) -> Embed {
        let close = &self.config.thread.close;
        Embed::new()
            .with_title(&close.title)
            .with_description(close.response.replace("{closer}", &format!("<@{}>", closer.id)))
            .with_color(self.config.colors.main_color)
            .with_timestamp(Utc::now())
    }

    pub fn close_to_user(&self, self_closed: bool) -> Embed {
        let close = &self.config.thread.close;
        let description = if self_closed {
            close.self_close_response.clone()
        } else {
            close.response.replace("{closer}", "The staff team")
        };
        Embed::new()
            .with_title(&close.title)
            .with_description(description)
            .with_footer_text(&close.footer)
            .with_color(self.config.colors.main_color)
            .with_timestamp(Utc::now())
    }
}

/// What `handle_incoming` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Not a relayable direct message.
    Ignored,
    Relayed {
        thread: Snowflake,
        created_ticket: bool,
    },
}

/// Relays direct messages into staff threads and staff replies back out.
pub struct TicketRelay<M: Messenger> {
    config: Arc<ModmailConfig>,
    messenger: M,
    embeds: TicketEmbeds,
    relay_channel: Snowflake,
    bot_user: Snowflake,
    tickets: TicketRegistry,
}

impl<M: Messenger> TicketRelay<M> {
    pub fn new(
        config: Arc<ModmailConfig>,
        messenger: M,
        relay_channel: Snowflake,
        bot_user: Snowflake,
    ) -> Self {
        Self {
            embeds: TicketEmbeds::new(config.clone()),
            config,
            messenger,
            relay_channel,
            bot_user,
            tickets: TicketRegistry::new(),
        }
    }

    pub fn tickets(&self) -> &TicketRegistry {
        &self.tickets
    }

    /// Relay an incoming message, opening a ticket if the sender has no
    /// active thread or their previous one was archived.
    ///
    /// Messages from the bot itself, guild messages, and messages starting
    /// with the command prefix are not relayed.
    pub async fn handle_incoming(&mut self, message: &ChatMessage) -> Result<RelayOutcome> {
        if message.author.id == self.bot_user || !message.is_dm() {
            return Ok(RelayOutcome::Ignored);
        }
        if message.content.starts_with(&self.config.bot.prefix) {
            return Ok(RelayOutcome::Ignored);
        }

        let recipient = message.author.id;
        let (thread, created) = match self.tickets.get_by_recipient(recipient) {
            Some(ticket) => {
                let thread = ticket.thread;
                if self.messenger.is_thread_archived(thread).await? {
                    tracing::debug!(
                        "Thread {} for recipient {} is archived, starting a new one",
                        thread,
                        recipient
                    );
                    self.tickets.remove_by_recipient(recipient)?;
                    (self.start_thread(message).await?, true)
                } else {
                    (thread, false)
                }
            }
            None => (self.start_thread(message).await?, true),
        };

        let relayed = self
            .messenger
            .send_to_channel(thread, None, self.embeds.message_to_guild(message))
            .await?;

        let ticket = self
            .tickets
            .get_by_recipient_mut(recipient)
            .ok_or_else(|| ModmailError::TicketNotFoundError {
                lookup: format!("recipient {}", recipient),
            })?;
        ticket.messages.link(message.id, relayed.id);
        ticket.last_sent_message = Some(relayed.id);

        Ok(RelayOutcome::Relayed {
            thread,
            created_ticket: created,
        })
    }

    /// Deliver a staff reply to the ticket's recipient.
    pub async fn reply_from_staff(
        &mut self,
        thread: Snowflake,
        staff: &UserRef,
        contents: &str,
        anonymous: bool,
    ) -> Result<ChatMessage> {
        let recipient = self
            .tickets
            .get_by_thread(thread)
            .ok_or_else(|| ModmailError::TicketNotFoundError {
                lookup: format!("thread {}", thread),
            })?
            .recipient;

        let sent = self
            .messenger
            .send_dm(recipient, self.embeds.message_to_user(contents, staff, anonymous))
            .await?;

        if let Some(ticket) = self.tickets.get_by_recipient_mut(recipient) {
            ticket.last_sent_message = Some(sent.id);
        }
        Ok(sent)
    }

    /// Close a ticket: announce in the thread, archive it, and notify the
    /// recipient. Returns the removed ticket.
    pub async fn close_ticket(&mut self, thread: Snowflake, closer: &UserRef) -> Result<Ticket> {
        let ticket = self.tickets.remove_by_thread(thread)?;
        let self_closed = closer.id == ticket.recipient;

        self.messenger
            .send_to_channel(thread, None, self.embeds.close_to_thread(closer))
            .await?;
        self.messenger.archive_thread(thread).await?;
        self.messenger
            .send_dm(ticket.recipient, self.embeds.close_to_user(self_closed))
            .await?;

        tracing::info!(
            "Closed ticket for recipient {} (thread {})",
            ticket.recipient,
            thread
        );
        Ok(ticket)
    }

    async fn start_thread(&mut self, message: &ChatMessage) -> Result<Snowflake> {
        let announcement = self
            .messenger
            .send_to_channel(
                self.relay_channel,
                Some(self.config.thread.mention.clone()),
                self.embeds.initial_to_guild(message),
            )
            .await?;

        let thread = self
            .messenger
            .create_thread(announcement.id, message.author.id.to_string())
            .await?;

        let mut ticket = Ticket::new(message.author.id, thread);
        let auto_close = self.config.thread.auto_close.time_seconds;
        if auto_close > 0 {
            ticket.close_after = Some(auto_close);
        }
        self.tickets.insert(ticket)?;
        self.messenger
            .send_dm(message.author.id, self.embeds.initial_to_user())
            .await?;

        tracing::info!(
            "Opened ticket for recipient {} (thread {})",
            message.author.id,
            thread
        );
        Ok(thread)
    }
}
