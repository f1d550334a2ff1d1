use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AudioAsset, Extraction, SourceExtractor, SourceKind, SourceMetadata};
use crate::config::Config;
use crate::{require_env, Result, StreamError};

pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Sub-classification of Spotify locators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyItem {
    /// Has a downloadable (preview) audio asset
    Track,
    /// Metadata only, never downloaded
    Episode,
}

impl SpotifyItem {
    pub fn classify(locator: &str) -> Result<Self> {
        let lower = locator.to_lowercase();
        if lower.contains("episode") {
            Ok(SpotifyItem::Episode)
        } else if lower.contains("track") {
            Ok(SpotifyItem::Track)
        } else {
            Err(StreamError::UnsupportedLocator(format!(
                "Spotify locator is neither a track nor an episode: {}",
                locator
            ))
            .into())
        }
    }
}

/// Item id: the last path segment without any query string
pub fn item_id(locator: &str) -> Option<&str> {
    locator
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split('?').next())
        .filter(|id| !id.is_empty())
}

/// Remote calls the Spotify extractor depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn track(&self, id: &str) -> Result<Value>;

    async fn episode(&self, id: &str) -> Result<Value>;

    /// Download an audio file to `target`
    async fn download(&self, url: &str, target: &Path) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Spotify Web API client using the client-credentials flow
pub struct SpotifyWebApi {
    client: Client,
    api_base: String,
    token_url: String,
    market: String,
    token: Mutex<Option<String>>,
}

impl SpotifyWebApi {
    pub fn new(market: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            market: market.to_string(),
            token: Mutex::new(None),
        }
    }

    /// Credentials are read from the environment on the first request
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let client_id = require_env(CLIENT_ID_ENV)?;
        let client_secret = require_env(CLIENT_SECRET_ENV)?;

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to reach Spotify accounts service")?;

        if !response.status().is_success() {
            anyhow::bail!("Spotify token request failed: HTTP {}", response.status());
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.api_base, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("market", self.market.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Spotify API request failed: HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SpotifyApi for SpotifyWebApi {
    async fn track(&self, id: &str) -> Result<Value> {
        self.get_json(&format!("tracks/{}", id)).await
    }

    async fn episode(&self, id: &str) -> Result<Value> {
        self.get_json(&format!("episodes/{}", id)).await
    }

    async fn download(&self, url: &str, target: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download audio: HTTP {}", response.status());
        }

        let mut file = tokio::fs::File::create(target)
            .await
            .with_context(|| format!("Failed to create {}", target.display()))?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Spotify track and episode extractor
pub struct SpotifyExtractor {
    api: Box<dyn SpotifyApi>,
}

impl SpotifyExtractor {
    pub fn new(api: Box<dyn SpotifyApi>) -> Self {
        Self { api }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Box::new(SpotifyWebApi::new(&config.spotify.market)))
    }

    async fn extract_track(&self, locator: &str, id: &str, work_dir: &Path) -> Extraction {
        let metadata = match self.api.track(id).await {
            Ok(info) => track_metadata(&info, locator),
            Err(e) => {
                tracing::error!("Error fetching Spotify track info: {:#}", e);
                placeholder_metadata(locator)
            }
        };

        let audio = match metadata.get_str("preview_url") {
            Some(preview) => {
                let target = work_dir.join(format!(
                    "audio_{}.mp3",
                    &Uuid::new_v4().simple().to_string()[..8]
                ));
                match self.api.download(preview, &target).await {
                    Ok(()) => Some(AudioAsset::new(target)),
                    Err(e) => {
                        tracing::error!("Error downloading Spotify preview: {:#}", e);
                        None
                    }
                }
            }
            None => {
                tracing::warn!("Spotify track has no downloadable preview");
                None
            }
        };

        Extraction {
            kind: SourceKind::Audio,
            title: metadata.display("title"),
            attribution: format!("Artist: {}", metadata.display("artist")),
            metadata,
            audio,
            content: None,
        }
    }

    async fn extract_episode(&self, locator: &str, id: &str) -> Extraction {
        let metadata = match self.api.episode(id).await {
            Ok(info) => episode_metadata(&info, locator),
            Err(e) => {
                tracing::error!("Error fetching Spotify episode info: {:#}", e);
                placeholder_metadata(locator)
            }
        };

        Extraction {
            kind: SourceKind::Audio,
            title: metadata.display("title"),
            attribution: format!("Show: {}", metadata.display("show")),
            metadata,
            audio: None,
            content: None,
        }
    }
}

pub fn track_metadata(info: &Value, url: &str) -> SourceMetadata {
    let artists = info["artists"]
        .as_array()
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| a["name"].as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|names| !names.is_empty())
        .unwrap_or_else(|| "unknown_artist".to_string());

    SourceMetadata::new()
        .with("title", info["name"].as_str().unwrap_or("unknown_title"))
        .with("artist", artists)
        .with("album", info["album"]["name"].as_str().unwrap_or(""))
        .with("duration", info["duration_ms"].as_u64().unwrap_or(0) / 1000)
        .with("release_date", info["album"]["release_date"].as_str().unwrap_or(""))
        .with("popularity", info["popularity"].as_u64().unwrap_or(0))
        .with("preview_url", info["preview_url"].clone())
        .with("url", url)
}

pub fn episode_metadata(info: &Value, url: &str) -> SourceMetadata {
    SourceMetadata::new()
        .with("title", info["name"].as_str().unwrap_or("unknown_title"))
        .with("show", info["show"]["name"].as_str().unwrap_or("unknown_show"))
        .with("publisher", info["show"]["publisher"].as_str().unwrap_or(""))
        .with("description", info["description"].as_str().unwrap_or(""))
        .with("duration", info["duration_ms"].as_u64().unwrap_or(0) / 1000)
        .with("release_date", info["release_date"].as_str().unwrap_or(""))
        .with("url", url)
}

fn placeholder_metadata(url: &str) -> SourceMetadata {
    SourceMetadata::new()
        .with("title", "unknown_title")
        .with("artist", "unknown_artist")
        .with("show", "unknown_show")
        .with("url", url)
}

#[async_trait]
impl SourceExtractor for SpotifyExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Audio
    }

    fn platform_name(&self) -> &'static str {
        "Spotify"
    }

    async fn extract(&self, locator: &str, work_dir: &Path) -> Result<Extraction> {
        let item = SpotifyItem::classify(locator)?;
        let id = item_id(locator).ok_or_else(|| {
            StreamError::UnsupportedLocator(format!("No Spotify id in {}", locator))
        })?;

        tracing::debug!("Spotify {:?} id: {}", item, id);

        Ok(match item {
            SpotifyItem::Track => self.extract_track(locator, id, work_dir).await,
            SpotifyItem::Episode => self.extract_episode(locator, id).await,
        })
    }
}
