use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::utils::error::{ModmailError, Result};

/// Which source an addon is from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Zip,
    Repo,
    Local,
}

/// A supported git hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHost {
    Github,
    Gitlab,
}

impl GitHost {
    pub fn name(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
        }
    }

    pub fn base_api_url(self) -> &'static str {
        match self {
            Self::Github => "https://api.github.com",
            Self::Gitlab => "https://gitlab.com/api/v4",
        }
    }

    /// API headers the host expects on requests.
    pub fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Github => &[("Accept", "application/vnd.github.v3+json")],
            Self::Gitlab => &[],
        }
    }

    pub fn repo_api_url(self, user: &str, repo: &str) -> String {
        match self {
            Self::Github => format!("{}/repos/{}/{}", self.base_api_url(), user, repo),
            Self::Gitlab => format!("{}/projects/{}%2F{}", self.base_api_url(), user, repo),
        }
    }

    pub fn zip_archive_api_url(self, user: &str, repo: &str) -> String {
        match self {
            Self::Github => format!("{}/zipball", self.repo_api_url(user, repo)),
            Self::Gitlab => format!("{}/repository/archive.zip", self.repo_api_url(user, repo)),
        }
    }
}

impl FromStr for GitHost {
    type Err = ModmailError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "github" => Ok(Self::Github),
            "gitlab" => Ok(Self::Gitlab),
            other => Err(ModmailError::InvalidAddonSpecError {
                input: other.to_string(),
                reason: "not a valid git host".to_string(),
            }),
        }
    }
}

fn url_parts_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?P<url>(?P<domain>.*\..+?)/(?P<path>.*))$")
            .expect("url parts regex is valid")
    })
}

fn zip_spec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?P<url>(?P<domain>.*\..+?)/(?P<path>.*\.zip)) (?P<addon>[^@\s]+)$")
            .expect("zip spec regex is valid")
    })
}

fn repo_spec_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Github allows usernames from 1 to 39 characters and projects of 1 to
        // 100 characters; gitlab allows up to 255 for both. The user pattern
        // covers the union.
        Regex::new(
            r"^(?:(?:https?://)?(?P<githost>github|gitlab)(?:\.com/| )?)?(?P<user>[a-zA-Z0-9][a-zA-Z0-9\-]{0,254})/(?P<repo>[\w\-\.]{1,100}) (?P<addon>[^@\s]+)(?: @(?P<reflike>[\w\.\s]*))?$",
        )
        .expect("repo spec regex is valid")
    })
}

/// Where an addon's zip archive can be fetched from.
///
/// These could be from github, gitlab, or a hosted zip file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonSource {
    /// Archive URL without the scheme; the downloader prepends its own.
    pub zip_url: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub source_type: SourceType,

    pub user: Option<String>,
    pub repo: Option<String>,
    pub reflike: Option<String>,
    pub githost: Option<GitHost>,
}

impl AddonSource {
    fn new(zip_url: &str, source_type: SourceType) -> Result<Self> {
        let caps = url_parts_regex().captures(zip_url).ok_or_else(|| {
            ModmailError::InvalidAddonSpecError {
                input: zip_url.to_string(),
                reason: "not a recognizable archive URL".to_string(),
            }
        })?;

        Ok(Self {
            zip_url: caps["url"].to_string(),
            domain: Some(caps["domain"].to_string()),
            path: Some(caps["path"].to_string()),
            source_type,
            user: None,
            repo: None,
            reflike: None,
            githost: None,
        })
    }

    /// Create an AddonSource from a git repository.
    pub fn from_repo(
        user: &str,
        repo: &str,
        reflike: Option<&str>,
        githost: GitHost,
    ) -> Result<Self> {
        let zip_url = githost.zip_archive_api_url(user, repo);
        let mut source = Self::new(&zip_url, SourceType::Repo)?;
        source.user = Some(user.to_string());
        source.repo = Some(repo.to_string());
        source.reflike = reflike.map(str::to_string);
        source.githost = Some(githost);
        Ok(source)
    }

    /// Create an AddonSource from a hosted zip file.
    pub fn from_zip(url: &str) -> Result<Self> {
        Self::new(url, SourceType::Zip)
    }

    /// The cache key this source's archive is stored under.
    pub fn cache_name(&self) -> Result<String> {
        match self.source_type {
            SourceType::Repo => {
                let githost = self.githost.ok_or(ModmailError::UnsupportedSourceError)?;
                let user = self.user.as_deref().ok_or(ModmailError::UnsupportedSourceError)?;
                let repo = self.repo.as_deref().ok_or(ModmailError::UnsupportedSourceError)?;
                Ok(format!("{}/{}/{}", githost.name(), user, repo))
            }
            SourceType::Zip => {
                let path = self.path.as_deref().ok_or(ModmailError::UnsupportedSourceError)?;
                Ok(path.trim_end_matches(".zip").to_string())
            }
            SourceType::Local => Err(ModmailError::UnsupportedSourceError),
        }
    }
}

/// An addon which is a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: String,
    pub source: Option<AddonSource>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub min_version: Option<String>,
    pub enabled: bool,
}

impl Plugin {
    pub fn new(name: impl Into<String>, source: Option<AddonSource>) -> Self {
        Self {
            name: name.into(),
            source,
            description: None,
            folder: None,
            min_version: None,
            enabled: true,
        }
    }
}

impl FromStr for Plugin {
    type Err = ModmailError;

    /// Parse a user-supplied plugin spec.
    ///
    /// Accepted forms:
    /// - `https://host/path/archive.zip addon`
    /// - `[githost ]user/repo addon [@ref]` where githost may also be a full
    ///   `https://github.com/`-style prefix.
    fn from_str(argument: &str) -> Result<Self> {
        if let Some(caps) = zip_spec_regex().captures(argument) {
            tracing::debug!("Matched as a zip, creating a Plugin from zip.");
            let source = AddonSource::from_zip(&caps["url"])?;
            return Ok(Plugin::new(&caps["addon"], Some(source)));
        }

        let caps = repo_spec_regex().captures(argument).ok_or_else(|| {
            ModmailError::InvalidAddonSpecError {
                input: argument.to_string(),
                reason: "not a valid source and plugin".to_string(),
            }
        })?;

        let githost = match caps.name("githost") {
            Some(m) => m.as_str().parse()?,
            None => GitHost::Github,
        };
        let source = AddonSource::from_repo(
            &caps["user"],
            &caps["repo"],
            caps.name("reflike").map(|m| m.as_str()),
            githost,
        )?;
        Ok(Plugin::new(&caps["addon"], Some(source)))
    }
}

#[derive(Debug, Deserialize)]
struct PluginManifest {
    #[serde(default)]
    plugins: Vec<PluginManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct PluginManifestEntry {
    name: String,
    folder: Option<String>,
    description: Option<String>,
    min_bot_version: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Parse a `plugin.toml` manifest into plugin entries.
pub fn parse_plugin_manifest(contents: &str) -> Result<Vec<Plugin>> {
    let manifest: PluginManifest = toml::from_str(contents)?;
    Ok(manifest
        .plugins
        .into_iter()
        .map(|entry| Plugin {
            name: entry.name,
            source: None,
            description: entry.description,
            folder: entry.folder,
            min_version: entry.min_bot_version,
            enabled: entry.enabled,
        })
        .collect())
}
