use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use shell_core::{LoaderConfig, Origin, OriginList};
use shell_engine::FetchSettings;

/// Offline copy of the hub shipped with the app crate.
const BUNDLED_INDEX: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/web/index.html");

/// On-disk shell configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Tried in order; the last one must be a local file. Relative paths are
    /// resolved against the directory of the config file.
    pub origins: Vec<String>,
    pub attempt_timeout_secs: u64,
    pub total_timeout_secs: u64,
    pub debug_logging: bool,
    pub max_body_bytes: u64,
    pub output_dir: PathBuf,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            origins: vec![
                "https://fkhambaty.github.io/FKTI-Learning-Hub/".to_string(),
                "https://fkti-learning-hub.netlify.app/".to_string(),
                BUNDLED_INDEX.to_string(),
            ],
            attempt_timeout_secs: 15,
            total_timeout_secs: 45,
            debug_logging: true,
            max_body_bytes: FetchSettings::default().max_bytes,
            output_dir: PathBuf::from("output"),
            base_dir: None,
        }
    }
}

impl ShellConfig {
    /// Reads `path`. `None` when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {path:?}"));
            }
        };
        let mut config =
            Self::parse(&content).with_context(|| format!("failed to parse config {path:?}"))?;
        config.base_dir = std::path::absolute(path)
            .ok()
            .and_then(|full| full.parent().map(Path::to_path_buf));
        Ok(Some(config))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = ron::from_str(content)?;
        ensure!(
            config.attempt_timeout_secs > 0,
            "attempt_timeout_secs must be positive"
        );
        ensure!(config.max_body_bytes > 0, "max_body_bytes must be positive");
        Ok(config)
    }

    pub fn loader_config(&self) -> anyhow::Result<LoaderConfig> {
        let locators: Vec<String> = self
            .origins
            .iter()
            .map(|raw| self.resolve_local(raw))
            .collect();
        let origins = OriginList::new(&locators).context("invalid origin list")?;
        let mut config = LoaderConfig::new(origins);
        config.attempt_timeout = Duration::from_secs(self.attempt_timeout_secs);
        config.total_budget = Duration::from_secs(self.total_timeout_secs);
        Ok(config)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            max_bytes: self.max_body_bytes,
            ..FetchSettings::default()
        }
    }

    /// Anchors a relative filesystem path to the config directory so the
    /// bundled fallback does not depend on the working directory.
    fn resolve_local(&self, raw: &str) -> String {
        let locator = raw.trim();
        let Some(base) = &self.base_dir else {
            return locator.to_string();
        };
        match Origin::parse(locator) {
            Ok(origin) if origin.is_local() && !locator.starts_with("file:") => {
                let path = Path::new(locator);
                if path.is_relative() {
                    base.join(path).to_string_lossy().into_owned()
                } else {
                    locator.to_string()
                }
            }
            _ => locator.to_string(),
        }
    }
}
