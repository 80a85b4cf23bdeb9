use crate::config::{DeviceConfig, Orientation, PluginSettings};
use crate::error::{AlbumError, Result};
use crate::pipeline;
use crate::sources::{self, AlbumSource, IMMICH_KEY, ProviderKind};
use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyRequirement {
    pub required: bool,
    pub service: String,
    pub expected_key: String,
}

/// Template the host renders to collect plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeyRequirement>,
}

/// Contract between the display host and an image generating plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn generate_settings_template(&self) -> SettingsTemplate {
        SettingsTemplate::default()
    }

    async fn generate_image(
        &self,
        settings: &PluginSettings,
        device: &dyn DeviceConfig,
    ) -> Result<DynamicImage>;
}

/// Shows one random photo from a remote album.
#[derive(Debug, Default)]
pub struct ImageAlbum;

impl ImageAlbum {
    async fn fetch(
        &self,
        settings: &PluginSettings,
        device: &dyn DeviceConfig,
    ) -> Result<DynamicImage> {
        let orientation = device.orientation();
        let Some(kind) = settings.album_provider.as_deref() else {
            tracing::warn!("no album provider configured");
            return Err(AlbumError::LoadFailed { source: None });
        };
        let kind: ProviderKind = kind.parse().map_err(|e| {
            tracing::warn!(provider = %kind, "unsupported album provider");
            AlbumError::load_failed(e)
        })?;
        let provider = sources::build_provider(kind, settings, device)?;
        let album = settings
            .album
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AlbumError::config("Album is required."))?;
        load_from(provider.as_ref(), album, orientation).await
    }
}

/// Run a provider and collapse any failure into the generic load error.
async fn load_from(
    provider: &dyn AlbumSource,
    album: &str,
    orientation: Orientation,
) -> Result<DynamicImage> {
    provider
        .get_image(album, orientation)
        .await
        .map_err(|e| {
            tracing::error!(album = %album, error = %e, "error grabbing image from album provider");
            AlbumError::load_failed(e)
        })
}

#[async_trait]
impl Plugin for ImageAlbum {
    fn generate_settings_template(&self) -> SettingsTemplate {
        SettingsTemplate {
            api_key: Some(ApiKeyRequirement {
                required: true,
                service: "Immich".to_string(),
                expected_key: IMMICH_KEY.to_string(),
            }),
        }
    }

    async fn generate_image(
        &self,
        settings: &PluginSettings,
        device: &dyn DeviceConfig,
    ) -> Result<DynamicImage> {
        let img = self.fetch(settings, device).await?;

        if !settings.pad_requested() {
            return Ok(img);
        }
        let orientation = device.orientation();
        let dims = pipeline::target_dimensions(device.get_resolution(), orientation);
        tracing::debug!(width = dims.0, height = dims.1, blur = settings.blur_background(), "padding image");
        if settings.blur_background() {
            Ok(pipeline::pad_blur(&img, dims))
        } else {
            let color = pipeline::parse_background_color(settings.background_color.as_deref())?;
            Ok(pipeline::pad_solid(&img, dims, color))
        }
    }
}
