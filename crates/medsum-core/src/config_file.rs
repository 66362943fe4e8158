use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SUMMARIZER_DIR: &str = "models/led-large-book-summary";
pub const DEFAULT_NER_DIR: &str = "models/biomedical-ner-all";
pub const DEFAULT_BIND: &str = "0.0.0.0:8501";
pub const DEFAULT_MAX_UPLOAD_MB: u32 = 50;
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub models: Option<ModelsConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub summarizer_dir: Option<String>,
    pub ner_dir: Option<String>,
    pub intra_threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub max_upload_mb: Option<u32>,
}

/// Platform config directory path: `<config_dir>/medsum/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("medsum").join("config.toml"))
}

/// Load config by cascading CWD `.medsum.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".medsum.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_models = base.models.unwrap_or_default();
    let overlay_models = overlay.models.unwrap_or_default();
    let base_server = base.server.unwrap_or_default();
    let overlay_server = overlay.server.unwrap_or_default();

    ConfigFile {
        models: Some(ModelsConfig {
            summarizer_dir: overlay_models
                .summarizer_dir
                .or(base_models.summarizer_dir),
            ner_dir: overlay_models.ner_dir.or(base_models.ner_dir),
            intra_threads: overlay_models.intra_threads.or(base_models.intra_threads),
        }),
        server: Some(ServerConfig {
            bind: overlay_server.bind.or(base_server.bind),
            max_upload_mb: overlay_server.max_upload_mb.or(base_server.max_upload_mb),
        }),
    }
}

/// Fully resolved settings: env vars > config file > defaults.
///
/// Front ends apply their own flags on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub summarizer_dir: PathBuf,
    pub ner_dir: PathBuf,
    pub intra_threads: usize,
    pub bind: String,
    pub max_upload_mb: u32,
}

impl Settings {
    /// Resolve from the cascaded config files and the process environment.
    pub fn load() -> Self {
        Self::resolve(&load_config(), |key| std::env::var(key).ok())
    }

    /// Resolve from a config and an environment lookup.
    pub fn resolve(file: &ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let models = file.models.clone().unwrap_or_default();
        let server = file.server.clone().unwrap_or_default();

        let summarizer_dir = env("MEDSUM_SUMMARIZER_MODEL")
            .or(models.summarizer_dir)
            .unwrap_or_else(|| DEFAULT_SUMMARIZER_DIR.to_string());
        let ner_dir = env("MEDSUM_NER_MODEL")
            .or(models.ner_dir)
            .unwrap_or_else(|| DEFAULT_NER_DIR.to_string());
        let intra_threads = env("MEDSUM_INTRA_THREADS")
            .and_then(|v| v.parse().ok())
            .or(models.intra_threads)
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_INTRA_THREADS);
        let bind = env("MEDSUM_BIND")
            .or(server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let max_upload_mb = env("MEDSUM_MAX_UPLOAD_MB")
            .and_then(|v| v.parse().ok())
            .or(server.max_upload_mb)
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Self {
            summarizer_dir: PathBuf::from(summarizer_dir),
            ner_dir: PathBuf::from(ner_dir),
            intra_threads,
            bind,
            max_upload_mb,
        }
    }
}
