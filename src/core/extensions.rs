use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::BotModeConfig;
use crate::core::dispatcher::{Dispatcher, HandlerId};
use crate::utils::error::{ModmailError, Result};

/// Run modes, combined bitwise into the active mode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BotMode {
    Production = 0b001,
    Develop = 0b010,
    PluginDev = 0b100,
}

impl BotMode {
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Turn the true/false mode flags from the config into a bitwise value.
pub fn determine_bot_mode(mode: &BotModeConfig) -> u8 {
    let mut bot_mode = 0;
    if mode.production {
        bot_mode |= BotMode::Production.bits();
    }
    if mode.develop {
        bot_mode |= BotMode::Develop.bits();
    }
    if mode.plugin_dev {
        bot_mode |= BotMode::PluginDev.bits();
    }
    bot_mode
}

/// Declares which run modes an extension should load under.
#[derive(Debug, Clone, Copy)]
pub struct ExtMetadata {
    pub load_if_mode: u8,
}

impl ExtMetadata {
    pub const fn production() -> Self {
        Self {
            load_if_mode: BotMode::Production.bits(),
        }
    }

    pub const fn develop_only() -> Self {
        Self {
            load_if_mode: BotMode::Develop.bits(),
        }
    }

    pub const fn plugin_dev_only() -> Self {
        Self {
            load_if_mode: BotMode::PluginDev.bits(),
        }
    }
}

impl Default for ExtMetadata {
    fn default() -> Self {
        Self::production()
    }
}

/// A unit of bot functionality that registers event handlers on load.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn metadata(&self) -> ExtMetadata {
        ExtMetadata::default()
    }

    /// Register this extension's handlers, returning their ids so the
    /// registry can unregister them on unload.
    fn setup(&self, dispatcher: &mut Dispatcher) -> Vec<HandlerId>;
}

/// Tracks loaded extensions and the handlers they own.
pub struct ExtensionRegistry {
    bot_mode: u8,
    loaded: HashMap<String, (Arc<dyn Extension>, Vec<HandlerId>)>,
}

impl ExtensionRegistry {
    pub fn new(bot_mode: u8) -> Self {
        tracing::debug!("Dev mode status: {}", bot_mode & BotMode::Develop.bits() != 0);
        tracing::debug!(
            "Plugin dev mode status: {}",
            bot_mode & BotMode::PluginDev.bits() != 0
        );
        Self {
            bot_mode,
            loaded: HashMap::new(),
        }
    }

    pub fn bot_mode(&self) -> u8 {
        self.bot_mode
    }

    /// Load an extension, registering its handlers. Returns `false` when
    /// the extension's metadata gates it out of the active mode set.
    pub fn load(&mut self, extension: Arc<dyn Extension>, dispatcher: &mut Dispatcher) -> Result<bool> {
        let name = extension.name().to_string();

        if self.loaded.contains_key(&name) {
            return Err(ModmailError::ExtensionAlreadyLoadedError { name });
        }

        if extension.metadata().load_if_mode & self.bot_mode == 0 {
            tracing::debug!("Skipping extension '{}', not enabled for current mode", name);
            return Ok(false);
        }

        let handler_ids = extension.setup(dispatcher);
        tracing::info!(
            "Loaded extension '{}' with {} handler(s)",
            name,
            handler_ids.len()
        );
        self.loaded.insert(name, (extension, handler_ids));
        Ok(true)
    }

    /// Unload an extension and unregister every handler it owns.
    pub fn unload(&mut self, name: &str, dispatcher: &mut Dispatcher) -> Result<()> {
        let (_, handler_ids) =
            self.loaded
                .remove(name)
                .ok_or_else(|| ModmailError::ExtensionNotLoadedError {
                    name: name.to_string(),
                })?;

        for id in handler_ids {
            dispatcher.unregister(id);
        }
        tracing::debug!("Unloaded extension '{}'", name);
        Ok(())
    }

    pub fn reload(&mut self, name: &str, dispatcher: &mut Dispatcher) -> Result<bool> {
        let extension = self
            .loaded
            .get(name)
            .map(|(ext, _)| ext.clone())
            .ok_or_else(|| ModmailError::ExtensionNotLoadedError {
                name: name.to_string(),
            })?;

        self.unload(name, dispatcher)?;
        self.load(extension, dispatcher)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loaded.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
