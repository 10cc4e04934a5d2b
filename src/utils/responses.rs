//! Helpers for responses from the bot to the user.
//!
//! These keep success and failure messages consistent between different uses.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::embeds::Embed;

pub const DEFAULT_SUCCESS_COLOR: u32 = 0x2ECC71;
pub const DEFAULT_ERROR_COLOR: u32 = 0xE74C3C;

pub const SUCCESS_HEADERS: &[&str] = &[
    "You got it.",
    "Done.",
    "Affirmative.",
    "As you wish.",
    "Okay.",
    "Fine by me.",
    "There we go.",
    "Sure!",
    "Your wish is my command.",
];

pub const ERROR_HEADERS: &[&str] = &[
    "Abort!",
    "FAIL.",
    "I cannot do that.",
    "Hold up!",
    "Mistakes were made.",
    "Nope.",
    "Not happening.",
    "Oops.",
    "Something went wrong.",
    "Sorry, no.",
    "This will never work.",
    "Uh. No.",
    "That is not happening.",
    "Whups.",
];

static SUCCESS_CURSOR: AtomicUsize = AtomicUsize::new(0);
static ERROR_CURSOR: AtomicUsize = AtomicUsize::new(0);

pub fn success_header() -> &'static str {
    let i = SUCCESS_CURSOR.fetch_add(1, Ordering::Relaxed);
    SUCCESS_HEADERS[i % SUCCESS_HEADERS.len()]
}

pub fn error_header() -> &'static str {
    let i = ERROR_CURSOR.fetch_add(1, Ordering::Relaxed);
    ERROR_HEADERS[i % ERROR_HEADERS.len()]
}

/// Build an affirmative response embed.
pub fn positive_response(response: &str) -> Embed {
    Embed::new()
        .with_color(DEFAULT_SUCCESS_COLOR)
        .with_title(success_header())
        .with_description(response)
}

/// Build a negatory response embed.
pub fn negatory_response(response: &str) -> Embed {
    Embed::new()
        .with_color(DEFAULT_ERROR_COLOR)
        .with_title(error_header())
        .with_description(response)
}

/// Build a response embed based on success or failure.
pub fn response(response_text: &str, success: bool) -> Embed {
    if success {
        positive_response(response_text)
    } else {
        negatory_response(response_text)
    }
}
