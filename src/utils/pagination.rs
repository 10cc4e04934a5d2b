use crate::domain::ticket::Snowflake;
use crate::utils::error::{ModmailError, Result};

// Stop button
pub const STOP_PAGINATE_EMOJI: &str = "\u{274c}"; // [:x:]

// Labels
pub const JUMP_FIRST_LABEL: &str = "\u{2590}\u{276e}\u{2012}"; // bar, left arrow, dash
pub const BACK_LABEL: &str = "  \u{276e}  "; // left arrow
pub const FORWARD_LABEL: &str = "  \u{276f}  "; // right arrow
pub const JUMP_LAST_LABEL: &str = "\u{2012}\u{276f}\u{258c}"; // dash, right arrow, bar

pub const DEFAULT_TIMEOUT_SECONDS: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorAction {
    JumpFirst,
    Back,
    Next,
    JumpLast,
    Stop,
}

/// Enabled/disabled state for each pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStates {
    pub jump_first_disabled: bool,
    pub back_disabled: bool,
    pub next_disabled: bool,
    pub jump_last_disabled: bool,
}

/// Pagination over a list of page contents.
///
/// Tracks the current index and which controls should be active, so a frontend
/// only has to render pages and feed back actions.
#[derive(Debug, Clone)]
pub struct Paginator {
    pages: Vec<String>,
    index: usize,
    timeout: f64,
    only: Option<Snowflake>,
    stopped: bool,
}

impl Paginator {
    pub fn new(pages: Vec<String>) -> Result<Self> {
        Self::with_timeout(pages, DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn with_timeout(pages: Vec<String>, timeout: f64) -> Result<Self> {
        if pages.is_empty() {
            return Err(ModmailError::PaginationError {
                message: "at least one page of contents is required".to_string(),
            });
        }
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(ModmailError::PaginationError {
                message: "timeout must be a positive number of seconds".to_string(),
            });
        }

        Ok(Self {
            pages,
            index: 0,
            timeout,
            only: None,
            stopped: false,
        })
    }

    /// Restrict interactions to a single user.
    pub fn only(mut self, user: Snowflake) -> Self {
        self.only = Some(user);
        self
    }

    pub fn current_page(&self) -> &str {
        &self.pages[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Check if the interacting user is allowed to drive this paginator.
    pub fn interaction_check(&self, user: Snowflake) -> bool {
        match self.only {
            Some(owner) => owner == user,
            None => true,
        }
    }

    /// Apply an action, returning whether the visible page changed.
    pub fn apply(&mut self, action: PaginatorAction) -> bool {
        if self.stopped {
            return false;
        }
        let previous = self.index;
        match action {
            PaginatorAction::JumpFirst => self.index = 0,
            PaginatorAction::Back => self.index = self.index.saturating_sub(1),
            PaginatorAction::Next => {
                if self.index + 1 < self.pages.len() {
                    self.index += 1;
                }
            }
            PaginatorAction::JumpLast => self.index = self.pages.len() - 1,
            PaginatorAction::Stop => {
                self.stopped = true;
                return false;
            }
        }
        self.index != previous
    }

    /// Compute which controls are disabled for the current page.
    pub fn button_states(&self) -> ButtonStates {
        let few_pages = self.pages.len() <= 2;
        let mut states = ButtonStates {
            jump_first_disabled: few_pages,
            back_disabled: false,
            next_disabled: false,
            jump_last_disabled: few_pages,
        };

        if self.index == 0 {
            states.jump_first_disabled = true;
            states.back_disabled = true;
        }

        if self.index == self.pages.len() - 1 {
            states.next_disabled = true;
            states.jump_last_disabled = true;
        }

        states
    }
}
