use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModmailError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Request to {url} returned status {status}")]
    UnexpectedStatusError { url: String, status: u16 },

    #[error("'{input}' is not a valid addon source: {reason}")]
    InvalidAddonSpecError { input: String, reason: String },

    #[error("No plugin directory exists, searched for: {searched}")]
    NoPluginDirectoryError { searched: String },

    #[error("Unsupported addon source")]
    UnsupportedSourceError,

    #[error("No ticket exists for {lookup}")]
    TicketNotFoundError { lookup: String },

    #[error("A ticket already exists for recipient {recipient}")]
    TicketAlreadyExistsError { recipient: u64 },

    #[error("Pagination error: {message}")]
    PaginationError { message: String },

    #[error("Extension '{name}' is already loaded")]
    ExtensionAlreadyLoadedError { name: String },

    #[error("Extension '{name}' is not loaded")]
    ExtensionNotLoadedError { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Config,
    Archive,
    Ticket,
    Extension,
    Io,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ModmailError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::UnexpectedStatusError { .. } => ErrorCategory::Network,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Config,
            Self::ZipError(_) | Self::NoPluginDirectoryError { .. } => ErrorCategory::Archive,
            Self::TicketNotFoundError { .. } | Self::TicketAlreadyExistsError { .. } => {
                ErrorCategory::Ticket
            }
            Self::ExtensionAlreadyLoadedError { .. } | Self::ExtensionNotLoadedError { .. } => {
                ErrorCategory::Extension
            }
            Self::IoError(_) => ErrorCategory::Io,
            Self::SerializationError(_)
            | Self::InvalidAddonSpecError { .. }
            | Self::UnsupportedSourceError
            | Self::PaginationError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::HttpError(_) | Self::UnexpectedStatusError { .. } => ErrorSeverity::Medium,
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorSeverity::Critical,
            Self::IoError(_) => ErrorSeverity::High,
            Self::TicketNotFoundError { .. }
            | Self::PaginationError { .. }
            | Self::ExtensionAlreadyLoadedError { .. }
            | Self::ExtensionNotLoadedError { .. } => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::HttpError(_) => "Check network connectivity and retry".to_string(),
            Self::UnexpectedStatusError { status, .. } => {
                format!("The remote host replied with {}, verify the source exists", status)
            }
            Self::MissingConfigError { field } => {
                format!("Set '{}' in config.toml or the environment", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in config.toml", field)
            }
            Self::TomlError(_) => "Fix the syntax of the configuration file".to_string(),
            Self::NoPluginDirectoryError { .. } => {
                "Ensure the addon archive has a plugins/ directory at its root".to_string()
            }
            Self::InvalidAddonSpecError { .. } => {
                "Use 'user/repo addon [@ref]' or a direct zip URL followed by the addon name"
                    .to_string()
            }
            _ => "See the log output for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("A network request failed: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::Archive => format!("Addon archive problem: {}", self),
            ErrorCategory::Ticket => format!("Ticket problem: {}", self),
            ErrorCategory::Extension => format!("Extension problem: {}", self),
            ErrorCategory::Io => format!("Filesystem problem: {}", self),
            ErrorCategory::Data => format!("Invalid data: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModmailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = ModmailError::MissingConfigError {
            field: "bot.token".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_status_error_suggestion_mentions_status() {
        let err = ModmailError::UnexpectedStatusError {
            url: "api.github.com/repos/a/b/zipball".to_string(),
            status: 404,
        };
        assert!(err.recovery_suggestion().contains("404"));
        assert_eq!(err.category(), ErrorCategory::Network);
    }
}
