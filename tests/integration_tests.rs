use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use httpmock::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use modmail::adapters::addons::AddonDownloader;
use modmail::domain::addon::AddonSource;
use modmail::core::relay::{RelayOutcome, TicketRelay};
use modmail::domain::model::{ChatMessage, UserRef};
use modmail::domain::ports::{Messenger, Storage};
use modmail::domain::ticket::Snowflake;
use modmail::utils::embeds::Embed;
use modmail::{LocalStorage, ModmailConfig, Result};

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                .unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_addon_archive_pipeline_with_real_http() {
    // Setup temporary cache directory
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());

    // A repository zipball: single wrapping directory, plugins inside,
    // plus a manifest describing one of them.
    let manifest = br#"
[[plugins]]
name = "Planet"
folder = "planet"
description = "Provides planet commands"
"#;
    let zipball = build_zip(&[
        ("modmail-plugins-main/plugin.toml", manifest.as_slice()),
        (
            "modmail-plugins-main/plugins/planet/planet.rs",
            b"// entry".as_slice(),
        ),
        (
            "modmail-plugins-main/plugins/earth/earth.rs",
            b"// entry".as_slice(),
        ),
    ]);

    // Setup mock HTTP server serving the zipball
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/modmail-plugins.zip");
        then.status(200)
            .header("Content-Type", "application/zip")
            .body(zipball);
    });

    let source = AddonSource::from_zip(&server.url("/modmail-plugins.zip")).unwrap();
    let downloader = AddonDownloader::new(storage.clone()).with_scheme("http");
    let fetched = downloader.fetch(&source).await.unwrap();
    api_mock.assert();

    // The restructured archive lands on disk under the source's cache key.
    assert_eq!(fetched.cache_key, "modmail-plugins.zip");
    let cached_path = temp_dir.path().join("modmail-plugins.zip");
    assert!(cached_path.exists());

    assert_eq!(
        fetched.plugin_names,
        vec!["earth".to_string(), "planet".to_string()]
    );
    assert_eq!(fetched.manifest.len(), 1);
    assert_eq!(fetched.manifest[0].name, "Planet");
    assert_eq!(fetched.manifest[0].folder.as_deref(), Some("planet"));

    // The cached copy had its wrapping directory removed.
    let cached = storage.read_file("modmail-plugins.zip").await.unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(cached)).unwrap();
    assert!(archive.by_name("plugin.toml").is_ok());
}

#[derive(Clone, Default)]
struct RecordingMessenger {
    state: Arc<std::sync::Mutex<RecordedState>>,
}

#[derive(Default)]
struct RecordedState {
    next_id: u64,
    channel_messages: Vec<(Snowflake, Option<String>, Embed)>,
    dms: Vec<(Snowflake, Embed)>,
    threads: Vec<(Snowflake, String, Snowflake)>,
    archived: Vec<Snowflake>,
}

impl RecordingMessenger {
    fn bot_message(id: u64, channel: Snowflake) -> ChatMessage {
        ChatMessage {
            id: Snowflake(id),
            author: UserRef {
                id: Snowflake(1),
                name: "modmail".to_string(),
                discriminator: "0000".to_string(),
                bot: true,
                avatar_url: None,
            },
            content: String::new(),
            channel_id: channel,
            guild_id: Some(Snowflake(9)),
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_to_channel(
        &self,
        channel: Snowflake,
        content: Option<String>,
        embed: Embed,
    ) -> Result<ChatMessage> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = 1000 + state.next_id;
        state.channel_messages.push((channel, content, embed));
        Ok(Self::bot_message(id, channel))
    }

    async fn send_dm(&self, user: Snowflake, embed: Embed) -> Result<ChatMessage> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = 1000 + state.next_id;
        state.dms.push((user, embed));
        Ok(Self::bot_message(id, user))
    }

    async fn create_thread(&self, parent_message: Snowflake, name: String) -> Result<Snowflake> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = Snowflake(1000 + state.next_id);
        state.threads.push((parent_message, name, id));
        Ok(id)
    }

    async fn archive_thread(&self, thread: Snowflake) -> Result<()> {
        self.state.lock().unwrap().archived.push(thread);
        Ok(())
    }

    async fn is_thread_archived(&self, thread: Snowflake) -> Result<bool> {
        Ok(self.state.lock().unwrap().archived.contains(&thread))
    }
}

#[tokio::test]
async fn test_full_ticket_lifecycle() {
    let messenger = RecordingMessenger::default();
    let mut relay = TicketRelay::new(
        Arc::new(ModmailConfig::default()),
        messenger.clone(),
        Snowflake(50),
        Snowflake(1),
    );

    let recipient = UserRef {
        id: Snowflake(42),
        name: "chell".to_string(),
        discriminator: "0001".to_string(),
        bot: false,
        avatar_url: None,
    };
    let staff = UserRef {
        id: Snowflake(7),
        name: "wheatley".to_string(),
        discriminator: "0002".to_string(),
        bot: false,
        avatar_url: None,
    };

    // A member opens a ticket by messaging the bot.
    let first = ChatMessage {
        id: Snowflake(500),
        author: recipient.clone(),
        content: "I need help with my account".to_string(),
        channel_id: Snowflake(77),
        guild_id: None,
        timestamp: Utc::now(),
    };
    let outcome = relay.handle_incoming(&first).await.unwrap();
    let RelayOutcome::Relayed { thread, created_ticket } = outcome else {
        panic!("expected a relayed outcome");
    };
    assert!(created_ticket);

    // Staff reply back and forth, then close the ticket.
    relay
        .reply_from_staff(thread, &staff, "Sure, what's going on?", false)
        .await
        .unwrap();

    let followup = ChatMessage {
        id: Snowflake(501),
        content: "I cannot log in".to_string(),
        ..first.clone()
    };
    let outcome = relay.handle_incoming(&followup).await.unwrap();
    assert_eq!(
        outcome,
        RelayOutcome::Relayed {
            thread,
            created_ticket: false
        }
    );

    relay.close_ticket(thread, &staff).await.unwrap();
    assert!(relay.tickets().is_empty());

    let state = messenger.state.lock().unwrap();
    assert_eq!(state.threads.len(), 1);
    assert!(state.archived.contains(&thread));
    // Creation confirmation, staff reply, close notice.
    assert_eq!(state.dms.len(), 3);

    // A new message after close opens a fresh thread.
    drop(state);
    let reopened = ChatMessage {
        id: Snowflake(502),
        content: "One more thing".to_string(),
        ..first
    };
    let outcome = relay.handle_incoming(&reopened).await.unwrap();
    let RelayOutcome::Relayed { thread: new_thread, created_ticket } = outcome else {
        panic!("expected a relayed outcome");
    };
    assert!(created_ticket);
    assert_ne!(new_thread, thread);
}
