//! Argument construction for the capture backend.
//!
//! Everything here is pure: the same inputs always produce the same argument
//! list, so command layouts can be checked without a real backend.

use std::path::{Path, PathBuf};

use super::encoder::EncoderProfile;

/// Audio codec settings appended whenever an audio device is captured
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "160k";

/// Filename pattern of ring-buffer segments (printf-style, 4-digit wrapping index)
pub const SEGMENT_PATTERN: &str = "buffer_%04d.mp4";

/// Screen grabber and matching audio input format for the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureInput {
    /// Windows desktop duplication via GDI, DirectShow audio
    Gdigrab,
    /// X11 display, PulseAudio audio
    X11grab { display: String },
    /// macOS AVFoundation screen device
    Avfoundation { screen_index: u32 },
}

impl CaptureInput {
    /// Input matching the platform the crate was built for
    pub fn native() -> Self {
        if cfg!(target_os = "windows") {
            CaptureInput::Gdigrab
        } else if cfg!(target_os = "macos") {
            CaptureInput::Avfoundation { screen_index: 1 }
        } else {
            CaptureInput::X11grab {
                display: std::env::var("DISPLAY").unwrap_or_else(|_| ":0.0".to_string()),
            }
        }
    }

    /// FFmpeg input format used for audio devices on this platform
    pub fn audio_format(&self) -> &'static str {
        match self {
            CaptureInput::Gdigrab => "dshow",
            CaptureInput::X11grab { .. } => "pulse",
            CaptureInput::Avfoundation { .. } => "avfoundation",
        }
    }

    fn video_args(&self, framerate: u32) -> Vec<String> {
        let (format, source) = match self {
            CaptureInput::Gdigrab => ("gdigrab", "desktop".to_string()),
            CaptureInput::X11grab { display } => ("x11grab", display.clone()),
            CaptureInput::Avfoundation { screen_index } => {
                ("avfoundation", format!("{}:none", screen_index))
            }
        };

        vec![
            "-f".to_string(),
            format.to_string(),
            "-framerate".to_string(),
            framerate.to_string(),
            "-i".to_string(),
            source,
        ]
    }

    fn audio_args(&self, device: &str) -> Vec<String> {
        let source = match self {
            CaptureInput::Gdigrab => format!("audio={}", device),
            CaptureInput::X11grab { .. } => device.to_string(),
            CaptureInput::Avfoundation { .. } => format!("none:{}", device),
        };

        vec![
            "-f".to_string(),
            self.audio_format().to_string(),
            "-i".to_string(),
            source,
        ]
    }
}

/// Ring-buffer segmentation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Length of one segment in seconds
    pub segment_secs: u64,
    /// Number of segment slots before the index wraps to 0
    pub wrap: u64,
}

/// Where the backend writes its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One continuous file
    File(PathBuf),
    /// Rolling segments inside a directory, named after [`SEGMENT_PATTERN`]
    Segments { dir: PathBuf, config: SegmentConfig },
}

impl OutputTarget {
    pub fn segments(dir: impl AsRef<Path>, config: SegmentConfig) -> Self {
        OutputTarget::Segments {
            dir: dir.as_ref().to_path_buf(),
            config,
        }
    }
}

/// Everything needed to launch one capture backend invocation.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    pub input: CaptureInput,
    pub encoder: EncoderProfile,
    pub audio_device: Option<String>,
    pub framerate: u32,
}

impl CaptureCommand {
    pub fn new(encoder: EncoderProfile, audio_device: Option<String>) -> Self {
        Self {
            input: CaptureInput::native(),
            encoder,
            audio_device,
            framerate: 30,
        }
    }

    pub fn with_input(mut self, input: CaptureInput) -> Self {
        self.input = input;
        self
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    pub fn build(&self, target: &OutputTarget) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        args.extend(self.input.video_args(self.framerate));

        if let Some(device) = &self.audio_device {
            args.extend(self.input.audio_args(device));
        }

        args.extend(self.encoder.args());

        if self.audio_device.is_some() {
            args.extend([
                "-c:a".to_string(),
                AUDIO_CODEC.to_string(),
                "-b:a".to_string(),
                AUDIO_BITRATE.to_string(),
            ]);
        }

        match target {
            OutputTarget::File(path) => {
                args.push("-y".to_string());
                args.push(path.to_string_lossy().to_string());
            }
            OutputTarget::Segments { dir, config } => {
                args.extend([
                    "-f".to_string(),
                    "segment".to_string(),
                    "-segment_time".to_string(),
                    config.segment_secs.to_string(),
                    "-segment_wrap".to_string(),
                    config.wrap.to_string(),
                    "-reset_timestamps".to_string(),
                    "1".to_string(),
                    "-y".to_string(),
                    dir.join(SEGMENT_PATTERN).to_string_lossy().to_string(),
                ]);
            }
        }

        args
    }
}
