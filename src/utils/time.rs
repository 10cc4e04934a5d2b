use chrono::{DateTime, TimeZone, Utc};

/// Milliseconds since the unix epoch of the first second of 2015.
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// Timestamp display modes for chat markdown.
///
/// Full docs on this format:
/// https://discord.com/developers/docs/reference#message-formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    ShortTime,     // 16:20
    LongTime,      // 16:20:30
    ShortDate,     // 20/04/2021
    LongDate,      // 20 April 2021
    ShortDateTime, // 20 April 2021 16:20
    LongDateTime,  // Tuesday, 20 April 2021 16:20
    RelativeTime,  // 2 months ago
}

impl TimestampStyle {
    pub fn marker(self) -> char {
        match self {
            Self::ShortTime => 't',
            Self::LongTime => 'T',
            Self::ShortDate => 'd',
            Self::LongDate => 'D',
            Self::ShortDateTime => 'f',
            Self::LongDateTime => 'F',
            Self::RelativeTime => 'R',
        }
    }
}

impl Default for TimestampStyle {
    fn default() -> Self {
        Self::ShortDateTime
    }
}

/// Return a chat-formatted timestamp markdown string.
pub fn format_timestamp(timestamp: DateTime<Utc>, style: TimestampStyle) -> String {
    format!("<t:{}:{}>", timestamp.timestamp(), style.marker())
}

/// The creation time encoded in a snowflake id.
pub fn snowflake_time(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22) + DISCORD_EPOCH;
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .unwrap_or_else(Utc::now)
}
