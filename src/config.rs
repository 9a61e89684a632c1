use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Length of one ring-buffer segment, not user configurable
pub const SEGMENT_DURATION_SECS: u64 = 10;

pub const MIN_BUFFER_MINUTES: u32 = 1;
pub const MAX_BUFFER_MINUTES: u32 = 30;

const APP_DIR_NAME: &str = "ScreenRecorder";
const BUFFER_DIR_NAME: &str = ".buffer";
const CATALOG_FILE_NAME: &str = "recordings.json";
const ENV_PREFIX: &str = "SCREEN_REPLAY";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Where finished recordings and replays are written
    pub output_dir: PathBuf,
    /// Application state (buffer directory, catalog)
    pub data_dir: PathBuf,
    /// Overrides `<data_dir>/.buffer`
    #[serde(default)]
    pub buffer_dir: Option<PathBuf>,
    /// Replay window length; clamped to [1, 30] on access
    buffer_duration_minutes: u32,
    pub ffmpeg_path: String,
    pub framerate: u32,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 7878,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_dirs(default_output_dir(), default_data_dir())
    }
}

impl Settings {
    /// Default settings rooted at explicit directories
    pub fn with_dirs(output_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            data_dir: data_dir.into(),
            buffer_dir: None,
            buffer_duration_minutes: 5,
            ffmpeg_path: "ffmpeg".to_string(),
            framerate: 30,
            http: HttpConfig::default(),
        }
    }

    /// Load settings from an optional file layered under `SCREEN_REPLAY_*`
    /// environment variables (nested keys use `__`, e.g. `SCREEN_REPLAY_HTTP__PORT`).
    pub fn load(path: &str) -> Result<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("output_dir", defaults.output_dir.to_string_lossy().to_string())?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("buffer_duration_minutes", defaults.buffer_duration_minutes as i64)?
            .set_default("ffmpeg_path", defaults.ffmpeg_path.clone())?
            .set_default("framerate", defaults.framerate as i64)?
            .set_default("http.bind", defaults.http.bind.clone())?
            .set_default("http.port", defaults.http.port as i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load settings from {}", path))?;

        let mut settings: Settings = settings
            .try_deserialize()
            .context("Invalid settings")?;

        settings.output_dir = expand_path(&settings.output_dir)?;
        settings.data_dir = expand_path(&settings.data_dir)?;
        if let Some(dir) = &settings.buffer_dir {
            settings.buffer_dir = Some(expand_path(dir)?);
        }

        Ok(settings)
    }

    pub fn buffer_duration_minutes(&self) -> u32 {
        self.buffer_duration_minutes
            .clamp(MIN_BUFFER_MINUTES, MAX_BUFFER_MINUTES)
    }

    pub fn set_buffer_duration_minutes(&mut self, minutes: u32) {
        self.buffer_duration_minutes = minutes.clamp(MIN_BUFFER_MINUTES, MAX_BUFFER_MINUTES);
    }

    pub fn buffer_duration_seconds(&self) -> u64 {
        self.buffer_duration_minutes() as u64 * 60
    }

    pub fn segment_duration_seconds(&self) -> u64 {
        SEGMENT_DURATION_SECS
    }

    pub fn buffer_dir(&self) -> PathBuf {
        self.buffer_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(BUFFER_DIR_NAME))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE_NAME)
    }
}

fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Videos")))
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Expand `~` and `$VAR` in a configured path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
