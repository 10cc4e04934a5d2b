use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::{ModmailError, Result};
use crate::utils::time::snowflake_time;

/// A platform entity id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn created_at(self) -> DateTime<Utc> {
        snowflake_time(self.0)
    }
}

impl std::fmt::Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A map that stores every relayed message pair under both keys.
///
/// Looking up either side of a pair yields the other, so edits and deletions
/// can be mirrored regardless of which copy they originate from.
#[derive(Debug, Clone, Default)]
pub struct MessageLink {
    links: HashMap<Snowflake, Snowflake>,
}

impl MessageLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, a: Snowflake, b: Snowflake) {
        self.links.insert(a, b);
        self.links.insert(b, a);
    }

    pub fn counterpart(&self, message: Snowflake) -> Option<Snowflake> {
        self.links.get(&message).copied()
    }

    pub fn len(&self) -> usize {
        self.links.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// A single modmail conversation between a recipient and the staff team.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub recipient: Snowflake,
    pub thread: Snowflake,
    pub messages: MessageLink,
    /// Seconds of inactivity after which the staff thread auto-archives,
    /// taken from `thread.auto_close.time_seconds` when that is non-zero.
    pub close_after: Option<u64>,
    pub last_sent_message: Option<Snowflake>,
}

impl Ticket {
    pub fn new(recipient: Snowflake, thread: Snowflake) -> Self {
        tracing::trace!("Created a Ticket for recipient {} with thread {}", recipient, thread);
        Self {
            recipient,
            thread,
            messages: MessageLink::new(),
            close_after: None,
            last_sent_message: None,
        }
    }
}

/// In-memory index of open tickets, by recipient and by staff thread.
#[derive(Debug, Default)]
pub struct TicketRegistry {
    by_recipient: HashMap<Snowflake, Ticket>,
    thread_to_recipient: HashMap<Snowflake, Snowflake>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticket: Ticket) -> Result<()> {
        if self.by_recipient.contains_key(&ticket.recipient) {
            return Err(ModmailError::TicketAlreadyExistsError {
                recipient: ticket.recipient.0,
            });
        }
        self.thread_to_recipient.insert(ticket.thread, ticket.recipient);
        self.by_recipient.insert(ticket.recipient, ticket);
        Ok(())
    }

    pub fn get_by_recipient(&self, recipient: Snowflake) -> Option<&Ticket> {
        self.by_recipient.get(&recipient)
    }

    pub fn get_by_recipient_mut(&mut self, recipient: Snowflake) -> Option<&mut Ticket> {
        self.by_recipient.get_mut(&recipient)
    }

    pub fn get_by_thread(&self, thread: Snowflake) -> Option<&Ticket> {
        let recipient = self.thread_to_recipient.get(&thread)?;
        self.by_recipient.get(recipient)
    }

    pub fn remove_by_thread(&mut self, thread: Snowflake) -> Result<Ticket> {
        let recipient = self.thread_to_recipient.remove(&thread).ok_or_else(|| {
            ModmailError::TicketNotFoundError {
                lookup: format!("thread {}", thread),
            }
        })?;
        self.by_recipient
            .remove(&recipient)
            .ok_or_else(|| ModmailError::TicketNotFoundError {
                lookup: format!("recipient {}", recipient),
            })
    }

    pub fn remove_by_recipient(&mut self, recipient: Snowflake) -> Result<Ticket> {
        let ticket = self.by_recipient.remove(&recipient).ok_or_else(|| {
            ModmailError::TicketNotFoundError {
                lookup: format!("recipient {}", recipient),
            }
        })?;
        self.thread_to_recipient.remove(&ticket.thread);
        Ok(ticket)
    }

    pub fn len(&self) -> usize {
        self.by_recipient.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_recipient.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.by_recipient.values()
    }
}
