use anyhow::{Context, Result};
use std::{env, path::PathBuf};

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PORT: u16 = 3146;

/// Process-wide settings, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub image_base_url: String,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let tmdb_api_key = var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        let port = match var("CINESHELF_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("CINESHELF_PORT is not a valid port: {raw}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: trim_base(
                var("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string()),
            ),
            image_base_url: trim_base(
                var("TMDB_IMAGE_BASE_URL").unwrap_or_else(|| DEFAULT_IMAGE_BASE.to_string()),
            ),
            data_dir: var("CINESHELF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            port,
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn strips_trailing_slashes_from_base_urls() {
        assert_eq!(
            trim_base("https://api.themoviedb.org/3/".to_string()),
            "https://api.themoviedb.org/3"
        );
        assert_eq!(trim_base(" http://x ".to_string()), "http://x");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = load(&[]).expect_err("missing key");
        assert!(err.to_string().contains("TMDB_API_KEY"));

        let err = load(&[("TMDB_API_KEY", "  ")]).expect_err("blank key");
        assert!(err.to_string().contains("TMDB_API_KEY"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        for raw in ["abc", "70000", "-1"] {
            let err = load(&[("TMDB_API_KEY", "k"), ("CINESHELF_PORT", raw)])
                .expect_err("bad port");
            assert!(err.to_string().contains("CINESHELF_PORT"), "{raw}: {err}");
        }
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = load(&[("TMDB_API_KEY", "k")]).expect("config");
        assert_eq!(config.tmdb_api_key, "k");
        assert_eq!(config.tmdb_base_url, DEFAULT_TMDB_BASE);
        assert_eq!(config.image_base_url, DEFAULT_IMAGE_BASE);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn overrides_are_read_and_trimmed() {
        let config = load(&[
            ("TMDB_API_KEY", "k"),
            ("TMDB_BASE_URL", "http://localhost:9000/3/"),
            ("TMDB_IMAGE_BASE_URL", "http://img.local/t/p/"),
            ("CINESHELF_DATA_DIR", "/var/lib/cineshelf"),
            ("CINESHELF_PORT", "8080"),
        ])
        .expect("config");
        assert_eq!(config.tmdb_base_url, "http://localhost:9000/3");
        assert_eq!(config.image_base_url, "http://img.local/t/p");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/cineshelf"));
        assert_eq!(config.port, 8080);
    }
}
