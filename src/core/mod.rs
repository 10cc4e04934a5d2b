pub mod bot;
pub mod dispatcher;
pub mod extensions;
pub mod relay;

pub use bot::ModmailBot;
pub use dispatcher::{Dispatcher, HandlerId};
pub use extensions::{BotMode, ExtMetadata, Extension, ExtensionRegistry};
pub use relay::{RelayOutcome, TicketRelay};
