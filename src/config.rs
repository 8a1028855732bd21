
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;


// This is probably enough...?
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 5;


#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory every asset path is resolved against.
    pub root: PathBuf,
    pub worker_threads: usize,
    pub max_include_depth: usize,
    pub dirs: AssetDirs,
}

/// Per-tag subdirectories of the root.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssetDirs {
    pub textures: PathBuf,
    pub models: PathBuf,
    pub shaders: PathBuf,
    pub blobs: PathBuf,
}


impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            worker_threads: 2,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            dirs: AssetDirs::default(),
        }
    }
}

impl Default for AssetDirs {
    fn default() -> Self {
        Self {
            textures: PathBuf::from("textures"),
            models: PathBuf::from("models"),
            shaders: PathBuf::from("shaders"),
            blobs: PathBuf::from("blobs"),
        }
    }
}


impl AssetsConfig {

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(text)?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;

        Self::from_toml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))
    }

}



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(AssetsConfig::from_toml_str("").unwrap(), AssetsConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = AssetsConfig::from_toml_str(r#"
            root = "/srv/game"
            worker_threads = 6

            [dirs]
            textures = "img"
        "#).unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/game"));
        assert_eq!(config.worker_threads, 6);
        assert_eq!(config.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
        assert_eq!(config.dirs.textures, PathBuf::from("img"));
        assert_eq!(config.dirs.models, PathBuf::from("models"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(AssetsConfig::from_toml_str("worker_threads = \"many\"").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = AssetsConfig::from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/here.toml"));
    }
}
