use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};

use reqwest::Client;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::domain::addon::{parse_plugin_manifest, AddonSource, GitHost, Plugin};
use crate::domain::ports::Storage;
use crate::utils::error::{ModmailError, Result};

/// Directory names an addon archive may keep its plugins under.
pub const VALID_PLUGIN_DIRECTORIES: &[&str] = &["plugins", "Plugins"];

pub const PLUGIN_MANIFEST_NAME: &str = "plugin.toml";

/// Downloads addon archives and prepares them for plugin discovery.
pub struct AddonDownloader<S: Storage> {
    storage: S,
    client: Client,
    /// Sources keep their archive URLs schemeless; this decides what gets
    /// prepended at download time.
    scheme: String,
}

/// Result of fetching and inspecting an addon archive.
#[derive(Debug, Clone)]
pub struct FetchedAddon {
    /// Storage key the (restructured) archive was cached under.
    pub cache_key: String,
    /// Names of the plugin directories found in the archive.
    pub plugin_names: Vec<String>,
    /// Manifest entries, when the archive ships a plugin.toml.
    pub manifest: Vec<Plugin>,
}

impl<S: Storage> AddonDownloader<S> {
    pub fn new(storage: S) -> Self {
        Self::with_client(storage, Client::new())
    }

    pub fn with_client(storage: S, client: Client) -> Self {
        Self {
            storage,
            client,
            scheme: "https".to_string(),
        }
    }

    /// Override the URL scheme used for archive downloads.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Download the archive for `source` into cache storage.
    ///
    /// Returns the cache key the zip bytes were stored under.
    pub async fn download(&self, source: &AddonSource) -> Result<String> {
        let url = format!("{}://{}", self.scheme, source.zip_url);
        let cache_key = format!("{}.zip", source.cache_name()?);
        let headers = source.githost.map(GitHost::headers).unwrap_or(&[]);
        self.download_url(&url, &cache_key, headers).await?;
        Ok(cache_key)
    }

    /// Fetch an archive from an explicit URL and cache it under `cache_key`.
    pub async fn download_url(
        &self,
        url: &str,
        cache_key: &str,
        headers: &[(&str, &str)],
    ) -> Result<()> {
        tracing::debug!("Downloading addon archive from: {}", url);

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModmailError::UnexpectedStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let raw_bytes = response.bytes().await?;

        if self.storage.read_file(cache_key).await.is_ok() {
            tracing::info!("Zip file already exists, overwriting it.");
        }
        self.storage.write_file(cache_key, &raw_bytes).await?;

        Ok(())
    }

    /// Download, restructure, and inspect an addon archive in one pass.
    pub async fn fetch(&self, source: &AddonSource) -> Result<FetchedAddon> {
        let cache_key = self.download(source).await?;
        let raw = self.storage.read_file(&cache_key).await?;

        let flattened = flatten_archive(&raw)?;
        if flattened != raw {
            tracing::debug!("Restructured archive {} to remove its wrapping directory", cache_key);
            self.storage.write_file(&cache_key, &flattened).await?;
        }

        let plugin_names = find_plugins_in_archive(&flattened)?;
        let manifest = manifest_from_archive(&flattened)?;

        Ok(FetchedAddon {
            cache_key,
            plugin_names,
            manifest,
        })
    }
}

fn root_entries(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .filter_map(|name| name.split('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// If the archive root holds exactly one directory, rewrite the archive with
/// everything moved up a level.
///
/// Repository zipballs wrap their contents in a `user-repo-sha/` directory,
/// which plugin discovery does not expect.
pub fn flatten_archive(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let roots = root_entries(&names);
    if roots.len() != 1 {
        return Ok(bytes.to_vec());
    }
    let root = roots.into_iter().next().unwrap_or_default();
    let prefix = format!("{}/", root);
    // A single root *file* means there is nothing to unwrap.
    if !names.iter().all(|name| name.starts_with(&prefix)) {
        return Ok(bytes.to_vec());
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let new_name = match file.name().split_once('/') {
            Some((_, rest)) if !rest.is_empty() => rest.to_string(),
            _ => continue,
        };
        tracing::trace!("File name: {}", file.name());

        if new_name.ends_with('/') {
            writer.add_directory(new_name.trim_end_matches('/'), SimpleFileOptions::default())?;
        } else {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            writer.start_file(new_name, SimpleFileOptions::default())?;
            writer.write_all(&contents)?;
        }
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Find the plugins that are in a zip archive.
///
/// All plugins in an archive are located in directories directly under
/// `plugins/` or `Plugins/` at the archive root.
pub fn find_plugins_in_archive(bytes: &[u8]) -> Result<Vec<String>> {
    let archive = ZipArchive::new(Cursor::new(bytes))?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let plugin_dir = VALID_PLUGIN_DIRECTORIES
        .iter()
        .map(|dir| format!("{}/", dir))
        .find(|prefix| names.iter().any(|name| name.starts_with(prefix)))
        .ok_or_else(|| ModmailError::NoPluginDirectoryError {
            searched: VALID_PLUGIN_DIRECTORIES.join(" or "),
        })?;

    let mut plugins = BTreeSet::new();
    for name in &names {
        if let Some(rest) = name.strip_prefix(&plugin_dir) {
            if let Some((child, remainder)) = rest.split_once('/') {
                // Only direct child *directories* count as plugins.
                let _ = remainder;
                plugins.insert(child.to_string());
            }
        }
    }

    tracing::debug!("Plugins detected: {:?}", plugins);
    Ok(plugins.into_iter().collect())
}

/// All archive entries belonging to the named plugin.
pub fn plugin_entry_names(bytes: &[u8], plugin: &str) -> Result<Vec<String>> {
    let archive = ZipArchive::new(Cursor::new(bytes))?;
    let prefixes: Vec<String> = VALID_PLUGIN_DIRECTORIES
        .iter()
        .map(|dir| format!("{}/{}/", dir, plugin))
        .collect();

    Ok(archive
        .file_names()
        .filter(|name| prefixes.iter().any(|prefix| name.starts_with(prefix)))
        .map(str::to_string)
        .collect())
}

/// Parse the archive's plugin.toml manifest, if it has one.
pub fn manifest_from_archive(bytes: &[u8]) -> Result<Vec<Plugin>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut file = match archive.by_name(PLUGIN_MANIFEST_NAME) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    parse_plugin_manifest(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self::default()
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ModmailError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
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

    fn zip_names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn test_flatten_archive_moves_contents_up() {
        let bytes = build_zip(&[
            ("addons-main/", b""),
            ("addons-main/plugins/", b""),
            ("addons-main/plugins/planet/", b""),
            ("addons-main/plugins/planet/planet.rs", b"pub fn planet() {}"),
            ("addons-main/README.md", b"readme"),
        ]);

        let flattened = flatten_archive(&bytes).unwrap();
        let names = zip_names(&flattened);

        assert!(names.contains(&"plugins/planet/planet.rs".to_string()));
        assert!(names.contains(&"README.md".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("addons-main/")));
    }

    #[test]
    fn test_flatten_archive_keeps_multi_root_archives() {
        let bytes = build_zip(&[
            ("plugins/planet/planet.rs", b"x".as_slice()),
            ("README.md", b"readme".as_slice()),
        ]);

        let flattened = flatten_archive(&bytes).unwrap();
        assert_eq!(flattened, bytes);
    }

    #[test]
    fn test_flatten_preserves_file_contents() {
        let bytes = build_zip(&[("wrap/plugins/p/code.rs", b"contents here".as_slice())]);
        let flattened = flatten_archive(&bytes).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(flattened)).unwrap();
        let mut file = archive.by_name("plugins/p/code.rs").unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "contents here");
    }

    #[test]
    fn test_find_plugins_in_archive() {
        let bytes = build_zip(&[
            ("plugins/planet/planet.rs", b"x".as_slice()),
            ("plugins/earth/earth.rs", b"y".as_slice()),
            ("plugins/README.md", b"not a plugin".as_slice()),
        ]);

        let plugins = find_plugins_in_archive(&bytes).unwrap();
        assert_eq!(plugins, vec!["earth".to_string(), "planet".to_string()]);
    }

    #[test]
    fn test_find_plugins_capitalized_directory() {
        let bytes = build_zip(&[("Plugins/planet/planet.rs", b"x".as_slice())]);
        let plugins = find_plugins_in_archive(&bytes).unwrap();
        assert_eq!(plugins, vec!["planet".to_string()]);
    }

    #[test]
    fn test_find_plugins_missing_directory_errors() {
        let bytes = build_zip(&[("src/lib.rs", b"x".as_slice())]);
        let err = find_plugins_in_archive(&bytes).unwrap_err();
        assert!(matches!(err, ModmailError::NoPluginDirectoryError { .. }));
    }

    #[test]
    fn test_plugin_entry_names() {
        let bytes = build_zip(&[
            ("plugins/planet/planet.rs", b"x".as_slice()),
            ("plugins/planet/data/orbits.toml", b"y".as_slice()),
            ("plugins/earth/earth.rs", b"z".as_slice()),
        ]);

        let entries = plugin_entry_names(&bytes, "planet").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.starts_with("plugins/planet/")));
    }

    #[test]
    fn test_manifest_from_archive() {
        let manifest = br#"
[[plugins]]
name = "Planet"
folder = "planet"
"#;
        let bytes = build_zip(&[
            ("plugin.toml", manifest.as_slice()),
            ("plugins/planet/planet.rs", b"x".as_slice()),
        ]);

        let plugins = manifest_from_archive(&bytes).unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "Planet");
    }

    #[test]
    fn test_manifest_missing_is_empty() {
        let bytes = build_zip(&[("plugins/planet/planet.rs", b"x".as_slice())]);
        assert!(manifest_from_archive(&bytes).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_download_url_writes_archive_to_cache() {
        let server = MockServer::start();
        let zip_bytes = build_zip(&[("plugins/planet/planet.rs", b"x".as_slice())]);

        let mock = server.mock(|when, then| {
            when.method(GET).path("/some/archive.zip");
            then.status(200).body(zip_bytes.clone());
        });

        let storage = MockStorage::new();
        let downloader = AddonDownloader::new(storage.clone());

        downloader
            .download_url(&server.url("/some/archive.zip"), "some/archive.zip", &[])
            .await
            .unwrap();

        mock.assert();
        let cached = storage.get_file("some/archive.zip").await.unwrap();
        assert_eq!(cached, zip_bytes);
    }

    #[tokio::test]
    async fn test_download_url_rejects_error_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gone.zip");
            then.status(404);
        });

        let storage = MockStorage::new();
        let downloader = AddonDownloader::new(storage.clone());

        let err = downloader
            .download_url(&server.url("/gone.zip"), "gone.zip", &[])
            .await
            .unwrap_err();

        mock.assert();
        assert!(matches!(
            err,
            ModmailError::UnexpectedStatusError { status: 404, .. }
        ));
        assert!(storage.get_file("gone.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_download_url_sends_host_headers() {
        let server = MockServer::start();
        let zip_bytes = build_zip(&[("plugins/p/x.rs", b"x".as_slice())]);

        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/zipball")
                .header("Accept", "application/vnd.github.v3+json");
            then.status(200).body(zip_bytes.clone());
        });

        let storage = MockStorage::new();
        let downloader = AddonDownloader::new(storage);

        downloader
            .download_url(
                &server.url("/zipball"),
                "github/user/repo.zip",
                GitHost::Github.headers(),
            )
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_fetch_runs_full_pipeline() {
        let server = MockServer::start();
        let manifest = br#"
[[plugins]]
name = "Planet"
folder = "planet"
"#;
        let zip_bytes = build_zip(&[
            ("addons-main/plugin.toml", manifest.as_slice()),
            ("addons-main/plugins/planet/planet.rs", b"x".as_slice()),
            ("addons-main/plugins/earth/earth.rs", b"y".as_slice()),
        ]);

        let mock = server.mock(|when, then| {
            when.method(GET).path("/addons.zip");
            then.status(200).body(zip_bytes.clone());
        });

        let source = AddonSource::from_zip(&server.url("/addons.zip")).unwrap();
        let storage = MockStorage::new();
        let downloader = AddonDownloader::new(storage.clone()).with_scheme("http");

        let fetched = downloader.fetch(&source).await.unwrap();

        mock.assert();
        assert_eq!(fetched.cache_key, "addons.zip");
        assert_eq!(fetched.plugin_names, vec!["earth".to_string(), "planet".to_string()]);
        assert_eq!(fetched.manifest.len(), 1);
        assert_eq!(fetched.manifest[0].name, "Planet");

        // The cached copy is the restructured archive, not the raw download.
        let cached = storage.get_file("addons.zip").await.unwrap();
        let names = zip_names(&cached);
        assert!(names.contains(&"plugin.toml".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("addons-main/")));
    }

    #[tokio::test]
    async fn test_cached_archive_is_overwritten() {
        let server = MockServer::start();
        let new_bytes = build_zip(&[("plugins/p/new.rs", b"new".as_slice())]);

        server.mock(|when, then| {
            when.method(GET).path("/archive.zip");
            then.status(200).body(new_bytes.clone());
        });

        let storage = MockStorage::new();
        storage.write_file("p.zip", b"stale bytes").await.unwrap();

        let downloader = AddonDownloader::new(storage.clone());
        downloader
            .download_url(&server.url("/archive.zip"), "p.zip", &[])
            .await
            .unwrap();

        assert_eq!(storage.get_file("p.zip").await.unwrap(), new_bytes);
    }
}
