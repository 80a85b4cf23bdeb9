use crate::config::{DeviceConfig, Orientation, PluginSettings};
use crate::error::{AlbumError, Result};
use async_trait::async_trait;
use image::DynamicImage;
use rand::seq::IndexedRandom;
use rand::rng;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

/// Immich caps `size` for metadata search at 1000.
pub const PAGE_SIZE: u32 = 1000;
/// Environment key holding the Immich API key.
pub const IMMICH_KEY: &str = "IMMICH_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub album_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifInfo {
    pub exif_image_width: Option<u32>,
    pub exif_image_height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub exif_info: Option<ExifInfo>,
}

impl Asset {
    /// EXIF reported (width, height); missing values count as zero.
    pub fn dimensions(&self) -> (u32, u32) {
        let exif = self.exif_info.as_ref();
        (
            exif.and_then(|e| e.exif_image_width).unwrap_or(0),
            exif.and_then(|e| e.exif_image_height).unwrap_or(0),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    assets: SearchPage,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Asset>,
}

/// Keep only assets whose EXIF aspect ratio matches `orientation`.
pub fn filter_aligned(assets: Vec<Asset>, orientation: Orientation) -> Vec<Asset> {
    assets
        .into_iter()
        .filter(|a| {
            let (w, h) = a.dimensions();
            orientation.is_aligned(w, h)
        })
        .collect()
}

/// Anything able to hand back one image for a named album.
#[async_trait]
pub trait AlbumSource: Send + Sync {
    async fn get_image(&self, album: &str, orientation: Orientation) -> Result<DynamicImage>;
}

/// Supported album providers, as named by the `albumProvider` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Immich,
}

impl FromStr for ProviderKind {
    type Err = AlbumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Immich" => Ok(ProviderKind::Immich),
            other => Err(AlbumError::config(format!("Unknown album provider '{other}'."))),
        }
    }
}

/// Client for one Immich server.
pub struct ImmichClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ImmichClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Look up the id of the first album named exactly `name`.
    pub async fn resolve_album(&self, name: &str) -> Result<String> {
        let albums: Vec<Album> = self
            .http
            .get(self.url("/api/albums"))
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        albums
            .into_iter()
            .find(|a| a.album_name == name)
            .map(|a| a.id)
            .ok_or_else(|| AlbumError::not_found(format!("Album {name} not found.")))
    }

    /// Fetch every page of the album and return the ids of the assets matching `orientation`.
    pub async fn list_aligned_asset_ids(
        &self,
        album_id: &str,
        orientation: Orientation,
    ) -> Result<Vec<String>> {
        let url = self.url("/api/search/metadata");
        let mut all_items = Vec::new();
        let mut page = 1u32;
        loop {
            let body = json!({
                "albumIds": [album_id],
                "size": PAGE_SIZE,
                "page": page,
                "withExif": true,
            });
            let resp: SearchResponse = self
                .http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let items = resp.assets.items;
            tracing::debug!(album_id = %album_id, page, count = items.len(), "fetched album page");
            if items.is_empty() {
                break;
            }
            all_items.extend(items);
            page += 1;
        }
        let total = all_items.len();
        let aligned = filter_aligned(all_items, orientation);
        tracing::info!(album_id = %album_id, total, aligned = aligned.len(), %orientation, "listed album assets");
        Ok(aligned.into_iter().map(|a| a.id).collect())
    }

    async fn download(&self, asset_id: &str) -> Result<DynamicImage> {
        let bytes = self
            .http
            .get(self.url(&format!("/api/assets/{asset_id}/original")))
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(image::load_from_memory(&bytes)?)
    }

    /// Download random candidates until one is aligned. Misaligned picks are dropped from the
    /// candidate set; once a single candidate is left it is accepted as is.
    pub async fn download_one_aligned_image(
        &self,
        mut asset_ids: Vec<String>,
        orientation: Orientation,
    ) -> Result<DynamicImage> {
        loop {
            let asset_id = {
                let mut rng = rng();
                asset_ids
                    .choose(&mut rng)
                    .cloned()
                    .ok_or_else(|| AlbumError::not_found("No images to choose from."))?
            };
            tracing::info!(asset_id = %asset_id, "downloading image");
            let img = self.download(&asset_id).await?;

            if asset_ids.len() == 1 {
                tracing::info!(asset_id = %asset_id, "no aligned image found; using remaining image");
                return Ok(img);
            }
            if orientation.is_aligned(img.width(), img.height()) {
                return Ok(img);
            }
            asset_ids.retain(|id| id != &asset_id);
            tracing::info!(asset_id = %asset_id, remaining = asset_ids.len(), "image not aligned; retrying");
        }
    }
}

#[async_trait]
impl AlbumSource for ImmichClient {
    async fn get_image(&self, album: &str, orientation: Orientation) -> Result<DynamicImage> {
        tracing::info!(album = %album, "getting id for album");
        let album_id = self.resolve_album(album).await?;
        tracing::info!(album_id = %album_id, "getting asset ids for album");
        let asset_ids = self.list_aligned_asset_ids(&album_id, orientation).await?;
        self.download_one_aligned_image(asset_ids, orientation).await
    }
}

/// Factory creating a concrete boxed `AlbumSource` from the provider named in settings.
pub fn build_provider(
    kind: ProviderKind,
    settings: &PluginSettings,
    device: &dyn DeviceConfig,
) -> Result<Box<dyn AlbumSource>> {
    match kind {
        ProviderKind::Immich => {
            let key = device
                .load_env_key(IMMICH_KEY)
                .ok_or_else(|| AlbumError::config("Immich API Key not configured."))?;
            let url = settings
                .url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| AlbumError::config("URL is required."))?;
            Ok(Box::new(ImmichClient::new(url, &key)))
        }
    }
}
