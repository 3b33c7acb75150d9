//! Configuration for maker paths.
//!
//! Sources (highest priority first):
//! 1. Environment variables (MAKER_HOME, MAKER_FONTS_DIR)
//! 2. Defaults (~/.maker)
//!
//! The fonts cache directory is carried here explicitly and injected into
//! the font resolver, so tests can redirect it instead of fighting a
//! hard-coded home path.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Maker home directory (state that outlives a single invocation)
    pub home: PathBuf,
    /// Cache directory for downloaded fonts
    pub fonts_dir: PathBuf,
}

impl ResolvedConfig {
    /// Build a config rooted at an explicit home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let fonts_dir = home.join("fonts");
        Self { home, fonts_dir }
    }

    /// Candidate location for a bundled ffmpeg binary (`<home>/bin/ffmpeg`).
    pub fn bundled_ffmpeg(&self) -> PathBuf {
        self.home.join("bin").join(ffmpeg_binary_name())
    }
}

fn ffmpeg_binary_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

/// Load configuration from env vars and defaults.
fn load_config() -> Result<ResolvedConfig> {
    let home = match std::env::var("MAKER_HOME") {
        Ok(env_home) => PathBuf::from(env_home),
        Err(_) => dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".maker"),
    };

    let fonts_dir = std::env::var("MAKER_FONTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home.join("fonts"));

    Ok(ResolvedConfig { home, fonts_dir })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
