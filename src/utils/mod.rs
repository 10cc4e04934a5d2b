pub mod embeds;
pub mod error;
pub mod logger;
pub mod pagination;
pub mod responses;
pub mod time;
pub mod validation;
