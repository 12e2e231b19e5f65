use serde::Deserialize;
use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

const DEFAULT_ENV: &str = "dev";

#[derive(Debug, Deserialize, Clone)]
pub struct PresencedConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub image_format: ImageFormat,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub proxy: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    pub port: Option<u16>,
}

/// Static format avatar references are rendered in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[default]
    Webp,
    Jpeg,
    Jpg,
}

impl ImageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Jpeg => "jpeg",
            Self::Jpg => "jpg",
        }
    }
}

/// Loads the config for the watcher. Panics if reading the file fails or
/// parsing fails.
pub fn load_config(path: &Path) -> PresencedConfig {
    let file = File::open(path);
    assert!(file.is_ok(), "Cannot open JSON config at {:?}", path);
    let reader = BufReader::new(file.unwrap());
    serde_json::from_reader(reader).expect("Cannot parse JSON config")
}

pub fn get_config_path() -> Box<Path> {
    let mut buffer: PathBuf = ["/etc", "presenced"].iter().collect();
    let execution_env: String = env::var("PRESENCED_ENV")
        .unwrap_or_else(|_| String::from(DEFAULT_ENV))
        .to_lowercase();
    buffer.push(&execution_env);
    buffer.into_boxed_path()
}

#[cfg(test)]
mod tests {
    use super::{ImageFormat, PresencedConfig};
    use serde_json::json;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let config: PresencedConfig = serde_json::from_value(json!({
            "discord": {"bot_token": "abc123"}
        }))
        .unwrap();

        assert_eq!(config.discord.bot_token, "abc123");
        assert!(config.discord.proxy.is_none());
        assert!(config.members.is_empty());
        assert!(config.channels.is_empty());
        assert_eq!(config.image_format, ImageFormat::Webp);
        assert!(config.metrics.port.is_none());
    }

    #[test]
    fn test_image_format_is_validated() {
        let config: Result<PresencedConfig, _> = serde_json::from_value(json!({
            "discord": {"bot_token": "abc123"},
            "image_format": "gif"
        }));
        assert!(config.is_err());

        for format in ["png", "webp", "jpeg", "jpg"] {
            let config: PresencedConfig = serde_json::from_value(json!({
                "discord": {"bot_token": "abc123"},
                "image_format": format
            }))
            .unwrap();
            assert_eq!(config.image_format.as_str(), format);
        }
    }

    #[test]
    fn test_full_config() {
        let config: PresencedConfig = serde_json::from_value(json!({
            "discord": {"bot_token": "abc123", "proxy": "localhost:3000"},
            "members": ["302062212076699651"],
            "channels": ["920935287644169969"],
            "image_format": "png",
            "metrics": {"port": 9091}
        }))
        .unwrap();

        assert_eq!(config.members, vec!["302062212076699651"]);
        assert_eq!(config.channels, vec!["920935287644169969"]);
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.metrics.port, Some(9091));
    }
}
