//! Runtime configuration with environment overrides.

use std::path::PathBuf;

use crate::defaults;
use crate::error::{Error, Result};

/// Tunable settings of the archive, one field per `MNEMA_*` variable.
///
/// Defaults come from [`defaults`]; `from_env` applies overrides on top.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// `MNEMA_KEY_PATH`
    pub key_path: PathBuf,
    /// `MNEMA_AUDIT_LOG`
    pub audit_log_path: PathBuf,
    /// `MNEMA_MIN_SEMANTIC_SCORE`
    pub min_semantic_score: f32,
    /// `MNEMA_HNSW_NEIGHBORS`
    pub hnsw_neighbors: usize,
    /// `MNEMA_THUMBNAIL_CACHE_SIZE`
    pub thumbnail_cache_size: usize,
    /// `MNEMA_GEOCODER_URL`
    pub geocoder_url: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from(defaults::KEY_PATH),
            audit_log_path: PathBuf::from(defaults::AUDIT_LOG_PATH),
            min_semantic_score: defaults::MIN_SEMANTIC_SCORE,
            hnsw_neighbors: defaults::HNSW_NEIGHBORS,
            thumbnail_cache_size: defaults::THUMBNAIL_CACHE_SIZE,
            geocoder_url: defaults::GEOCODER_URL.to_string(),
        }
    }
}

impl ArchiveConfig {
    /// Defaults overridden by any `MNEMA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("MNEMA_KEY_PATH") {
            config.key_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MNEMA_AUDIT_LOG") {
            config.audit_log_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MNEMA_MIN_SEMANTIC_SCORE") {
            config.min_semantic_score = parse(&v, "MNEMA_MIN_SEMANTIC_SCORE")?;
        }
        if let Some(v) = lookup("MNEMA_HNSW_NEIGHBORS") {
            config.hnsw_neighbors = parse(&v, "MNEMA_HNSW_NEIGHBORS")?;
        }
        if let Some(v) = lookup("MNEMA_THUMBNAIL_CACHE_SIZE") {
            config.thumbnail_cache_size = parse(&v, "MNEMA_THUMBNAIL_CACHE_SIZE")?;
        }
        if let Some(v) = lookup("MNEMA_GEOCODER_URL") {
            config.geocoder_url = v;
        }

        if !(0.0..=1.0).contains(&config.min_semantic_score) {
            return Err(Error::Config(format!(
                "MNEMA_MIN_SEMANTIC_SCORE must be in [0, 1], got {}",
                config.min_semantic_score
            )));
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{key} has invalid value {value:?}")))
}
