use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::fs;
use toml_edit::DocumentMut;

#[cfg(feature = "embed_example")]
use rust_embed::RustEmbed;

#[cfg(feature = "embed_example")]
#[derive(RustEmbed)]
#[folder = "../"]
#[include = "album.example.toml"]
struct ConfigAssets;

/// Default on-disk config filename
pub const DEFAULT_CONFIG_PATH: &str = "album.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "album.png";
/// Panel resolution assumed when the device section does not set one.
pub const DEFAULT_RESOLUTION: (u32, u32) = (800, 480);

/// Strongly typed representation of the configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub logging: Option<Logging>,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub settings: PluginSettings,
    pub output: Option<Output>,
}

impl Config {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .as_ref()
            .and_then(|o| o.path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Logging {
    pub filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Output {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Whether an image of `w`x`h` pixels matches this orientation. Square images match neither.
    pub fn is_aligned(self, w: u32, h: u32) -> bool {
        match self {
            Orientation::Horizontal => w > h,
            Orientation::Vertical => w < h,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => f.write_str("horizontal"),
            Orientation::Vertical => f.write_str("vertical"),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// What the host exposes about the display the image is generated for.
pub trait DeviceConfig: Send + Sync {
    fn get_config(&self, key: &str) -> Option<String>;
    /// Secret lookup scoped to the host environment (API keys and the like).
    fn load_env_key(&self, key: &str) -> Option<String>;
    /// Native panel resolution as (width, height).
    fn get_resolution(&self) -> (u32, u32);

    fn orientation(&self) -> Orientation {
        self.get_config("orientation")
            .and_then(|o| match o.parse() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(value = %o, error = %e, "falling back to horizontal orientation");
                    None
                }
            })
            .unwrap_or_default()
    }
}

/// Device section of the config file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DeviceSettings {
    /// Kept as written; parsed (with a horizontal fallback) by `DeviceConfig::orientation`.
    pub orientation: Option<String>,
    pub resolution: Option<[u32; 2]>,
    /// Any other device level keys, available through `get_config`.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl DeviceConfig for DeviceSettings {
    fn get_config(&self, key: &str) -> Option<String> {
        match key {
            "orientation" => self.orientation.clone(),
            _ => self.extra.get(key).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    fn load_env_key(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn get_resolution(&self) -> (u32, u32) {
        self.resolution
            .map(|[w, h]| (w, h))
            .unwrap_or(DEFAULT_RESOLUTION)
    }
}

/// Per-invocation plugin settings. All values arrive as strings from the host form.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettings {
    pub album_provider: Option<String>,
    pub url: Option<String>,
    pub album: Option<String>,
    pub pad_image: Option<String>,
    pub background_option: Option<String>,
    pub background_color: Option<String>,
}

impl PluginSettings {
    /// Build settings from the raw key/value form the host submits.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |k: &str| map.get(k).cloned();
        Self {
            album_provider: get("albumProvider"),
            url: get("url"),
            album: get("album"),
            pad_image: get("padImage"),
            background_option: get("backgroundOption"),
            background_color: get("backgroundColor"),
        }
    }

    /// Only the literal string "true" turns padding on.
    pub fn pad_requested(&self) -> bool {
        self.pad_image.as_deref() == Some("true")
    }

    pub fn blur_background(&self) -> bool {
        self.background_option.as_deref() == Some("blur")
    }
}

/// Config file loaded from disk, kept as an editable document.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    doc: DocumentMut,
}

impl ConfigManager {
    /// Load existing config file. If the file does not exist, creates it from the embedded example.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            #[cfg(feature = "embed_example")]
            {
                if let Some(example_file) = ConfigAssets::get("album.example.toml") {
                    let example_content = std::str::from_utf8(&example_file.data)
                        .with_context(|| "embedded example config is not valid UTF-8")?;

                    fs::write(&path, example_content)
                        .await
                        .with_context(|| format!("writing example config to {}", path.display()))?;

                    println!("Created default config file: {}", path.display());
                    println!("   Please edit it to point at your photo service and album.");
                } else {
                    bail!(
                        "config file {} not found and embedded example is not available",
                        path.display()
                    );
                }
            }
            #[cfg(not(feature = "embed_example"))]
            {
                bail!("config file {} not found", path.display());
            }
        }

        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_str_at(path, &text)
    }

    fn from_str_at(path: PathBuf, text: &str) -> Result<Self> {
        let doc = text
            .parse::<DocumentMut>()
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert current document to strongly typed struct.
    pub fn to_struct(&self) -> Result<Config> {
        let typed: Config = toml_edit::de::from_document(self.doc.clone())?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
[logging]
filter = "debug"

[device]
orientation = "vertical"
resolution = [800, 480]
timezone = "Europe/Helsinki"

[settings]
albumProvider = "Immich"
url = "http://immich.local:2283"
album = "Frame"
padImage = "true"
backgroundOption = "color"
backgroundColor = "#000000"

[output]
path = "out.png"
"##;

    fn sample() -> Config {
        ConfigManager::from_str_at(PathBuf::from("test.toml"), SAMPLE)
            .unwrap()
            .to_struct()
            .unwrap()
    }

    #[test]
    fn parses_full_document() {
        let cfg = sample();
        assert_eq!(cfg.device.orientation(), Orientation::Vertical);
        assert_eq!(cfg.device.get_resolution(), (800, 480));
        assert_eq!(cfg.device.get_config("timezone").as_deref(), Some("Europe/Helsinki"));
        assert_eq!(cfg.settings.album_provider.as_deref(), Some("Immich"));
        assert!(cfg.settings.pad_requested());
        assert!(!cfg.settings.blur_background());
        assert_eq!(cfg.output_path(), PathBuf::from("out.png"));
        assert_eq!(cfg.logging.and_then(|l| l.filter).as_deref(), Some("debug"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ConfigManager::from_str_at(PathBuf::from("empty.toml"), "")
            .unwrap()
            .to_struct()
            .unwrap();
        assert_eq!(cfg.device.orientation(), Orientation::Horizontal);
        assert_eq!(cfg.device.get_resolution(), DEFAULT_RESOLUTION);
        assert_eq!(cfg.output_path(), PathBuf::from(DEFAULT_OUTPUT_PATH));
        assert!(!cfg.settings.pad_requested());
    }

    #[test]
    fn device_orientation_goes_through_get_config() {
        assert_eq!(sample().device.orientation(), Orientation::Vertical);
    }

    fn device_section(body: &str) -> DeviceSettings {
        ConfigManager::from_str_at(PathBuf::from("device.toml"), &format!("[device]\n{body}"))
            .unwrap()
            .to_struct()
            .unwrap()
            .device
    }

    #[test]
    fn orientation_is_case_insensitive_and_falls_back() {
        assert_eq!(
            device_section("orientation = \"Vertical\"").orientation(),
            Orientation::Vertical
        );
        assert_eq!(
            device_section("orientation = \"sideways\"").orientation(),
            Orientation::Horizontal
        );
    }

    #[test]
    fn non_string_device_keys_are_stringified() {
        let dev = device_section("refresh = 5\nsleep = true\nname = \"kitchen\"");
        assert_eq!(dev.get_config("refresh").as_deref(), Some("5"));
        assert_eq!(dev.get_config("sleep").as_deref(), Some("true"));
        assert_eq!(dev.get_config("name").as_deref(), Some("kitchen"));
        assert_eq!(dev.get_config("missing"), None);
    }

    #[test]
    fn orientation_alignment_is_strict() {
        assert!(Orientation::Horizontal.is_aligned(300, 200));
        assert!(!Orientation::Horizontal.is_aligned(200, 300));
        assert!(Orientation::Vertical.is_aligned(200, 300));
        assert!(!Orientation::Vertical.is_aligned(300, 200));
        assert!(!Orientation::Horizontal.is_aligned(250, 250));
        assert!(!Orientation::Vertical.is_aligned(250, 250));
    }

    #[test]
    fn pad_image_requires_literal_true() {
        let mut map = HashMap::new();
        map.insert("padImage".to_string(), "True".to_string());
        assert!(!PluginSettings::from_map(&map).pad_requested());
        map.insert("padImage".to_string(), "true".to_string());
        map.insert("backgroundOption".to_string(), "blur".to_string());
        let s = PluginSettings::from_map(&map);
        assert!(s.pad_requested());
        assert!(s.blur_background());
    }
}
