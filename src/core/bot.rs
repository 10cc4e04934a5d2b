use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::adapters::addons::AddonDownloader;
use crate::adapters::storage::LocalStorage;
use crate::config::{InternalConfig, ModmailConfig};
use crate::core::dispatcher::{Dispatcher, EventPayload};
use crate::core::extensions::{determine_bot_mode, Extension, ExtensionRegistry};
use crate::utils::error::Result;

/// Events the bot declares up front so handler registration typos are
/// caught with a warning instead of silently never firing.
pub const BOT_EVENTS: &[&str] = &[
    "message",
    "message_edit",
    "typing",
    "thread_create",
    "thread_close",
    "member_leave",
];

/// Base bot instance.
///
/// Owns the shared HTTP client, the event dispatcher, the extension
/// registry, and the addon downloader backed by the on-disk cache.
pub struct ModmailBot {
    pub config: Arc<ModmailConfig>,
    pub internal: InternalConfig,
    pub dispatcher: Dispatcher,
    pub extensions: ExtensionRegistry,
    pub addons: AddonDownloader<LocalStorage>,
    http_client: reqwest::Client,
    start_time: DateTime<Utc>,
}

impl ModmailBot {
    pub fn new(config: Arc<ModmailConfig>, cache_path: impl Into<PathBuf>) -> Result<Self> {
        let bot_mode = determine_bot_mode(&config.dev.mode);
        let http_client = reqwest::Client::builder().build()?;
        let addons =
            AddonDownloader::with_client(LocalStorage::new(cache_path), http_client.clone());

        Ok(Self {
            config,
            internal: InternalConfig::default(),
            dispatcher: Dispatcher::new(BOT_EVENTS),
            extensions: ExtensionRegistry::new(bot_mode),
            addons,
            http_client,
            start_time: Utc::now(),
        })
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }

    /// Load every given extension, skipping those gated out by the active
    /// mode set. Returns how many actually loaded.
    pub fn load_extensions(&mut self, extensions: Vec<Arc<dyn Extension>>) -> Result<usize> {
        let mut loaded = 0;
        for extension in extensions {
            if self.extensions.load(extension, &mut self.dispatcher)? {
                loaded += 1;
            }
        }
        tracing::info!("Loaded {} extension(s)", loaded);
        Ok(loaded)
    }

    pub async fn dispatch(&mut self, event_name: &str, payload: EventPayload) {
        self.dispatcher.dispatch(event_name, payload).await;
    }

    /// Unload all extensions on shutdown. Failures are logged and skipped
    /// so one bad extension cannot block the rest from cleaning up.
    pub fn close(&mut self) {
        for name in self
            .extensions
            .list()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
        {
            if let Err(e) = self.extensions.unload(&name, &mut self.dispatcher) {
                tracing::error!("Exception occurred while unloading '{}': {}", name, e);
            }
        }
        tracing::info!("Bot shut down after {}s of uptime", self.uptime().num_seconds());
    }
}
