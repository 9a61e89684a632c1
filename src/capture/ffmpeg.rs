//! FFmpeg capture backend
//!
//! Every child is created with `kill_on_drop(true)`, so a cancelled or
//! timed-out future never leaves an FFmpeg process behind.

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info};

use super::backend::{CaptureBackend, CaptureProcess};
use super::command::CaptureInput;
use super::encoder::EncoderProfile;
use crate::error::CaptureError;

/// Byte FFmpeg treats as "quit" on stdin
const QUIT_SIGNAL: &[u8] = b"q";

pub struct FfmpegBackend {
    binary: PathBuf,
    input: CaptureInput,
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            input: CaptureInput::native(),
        }
    }

    pub fn with_input(mut self, input: CaptureInput) -> Self {
        self.input = input;
        self
    }

    pub fn input(&self) -> &CaptureInput {
        &self.input
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true);

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }

    fn device_list_args(&self) -> Vec<&'static str> {
        match self.input {
            CaptureInput::Gdigrab => vec!["-hide_banner", "-list_devices", "true", "-f", "dshow", "-i", "dummy"],
            CaptureInput::Avfoundation { .. } => {
                vec!["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""]
            }
            CaptureInput::X11grab { .. } => vec!["-hide_banner", "-sources", "pulse"],
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FfmpegBackend {
    async fn spawn(&self, args: &[String]) -> Result<Box<dyn CaptureProcess>, CaptureError> {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Spawn(format!("{}: {}", self.binary.display(), e)))?;

        let stdin = child.stdin.take();

        Ok(Box::new(FfmpegProcess { child, stdin }))
    }

    async fn list_audio_devices(&self) -> Result<Vec<String>> {
        // The listing always "fails" (dummy input), so only the text matters
        let output = self
            .command()
            .args(self.device_list_args())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let devices = match self.input {
            CaptureInput::Gdigrab => parse_dshow_devices(&stderr),
            CaptureInput::Avfoundation { .. } => parse_avfoundation_devices(&stderr),
            CaptureInput::X11grab { .. } => parse_pulse_sources(&stdout),
        };

        debug!("Enumerated audio devices: {:?}", devices);
        Ok(devices)
    }

    async fn test_encoder(&self, encoder: &EncoderProfile) -> Result<bool> {
        let status = self
            .command()
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-f", "lavfi", "-i", "color=c=black:s=256x256:r=1"])
            .args(["-frames:v", "1"])
            .args(encoder.args())
            .args(["-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        Ok(status.success())
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<bool> {
        info!("Joining segments from {} into {}", manifest.display(), output.display());

        let status = self
            .command()
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-c", "copy", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        Ok(status.success())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

struct FfmpegProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

#[async_trait::async_trait]
impl CaptureProcess for FfmpegProcess {
    async fn request_stop(&mut self) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))?;

        stdin.write_all(QUIT_SIGNAL).await?;
        stdin.flush().await
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        self.stdin = None;
        Ok(status.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.stdin = None;
        match self.child.kill().await {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()), // already exited
            other => other,
        }
    }

    fn start_kill(&mut self) -> io::Result<()> {
        match self.child.start_kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Extract audio device names from `-list_devices true -f dshow` output.
///
/// Handles both the tagged layout (`"Name" (audio)`) and the older sectioned
/// layout ("DirectShow audio devices" header followed by quoted names).
pub fn parse_dshow_devices(output: &str) -> Vec<String> {
    let mut devices = Vec::new();
    let mut in_audio_section = false;

    for line in output.lines() {
        if line.contains("DirectShow audio devices") {
            in_audio_section = true;
            continue;
        }
        if line.contains("DirectShow video devices") {
            in_audio_section = false;
            continue;
        }
        if line.contains("Alternative name") {
            continue;
        }

        let tagged_audio = line.trim_end().ends_with("(audio)");
        if !(tagged_audio || in_audio_section) {
            continue;
        }

        if let Some(name) = quoted(line) {
            if !devices.iter().any(|d| d == name) {
                devices.push(name.to_string());
            }
        }
    }

    devices
}

/// Extract audio device names from `-f avfoundation -list_devices true` output.
pub fn parse_avfoundation_devices(output: &str) -> Vec<String> {
    let mut devices = Vec::new();
    let mut in_audio_section = false;

    for line in output.lines() {
        if line.contains("AVFoundation audio devices") {
            in_audio_section = true;
            continue;
        }
        if line.contains("AVFoundation video devices") {
            in_audio_section = false;
            continue;
        }
        if !in_audio_section {
            continue;
        }

        // "[AVFoundation indev @ 0x...] [0] MacBook Pro Microphone"
        let Some(idx_start) = line.rfind("] [") else { continue };
        let rest = &line[idx_start + 3..];
        if let Some(close) = rest.find("] ") {
            let name = rest[close + 2..].trim();
            if !name.is_empty() {
                devices.push(name.to_string());
            }
        }
    }

    devices
}

/// Extract source names from `-sources pulse` output.
pub fn parse_pulse_sources(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("  ") || line.starts_with("* "))
        .filter_map(|line| {
            let entry = line.trim_start_matches('*').trim();
            let name = entry.split(" [").next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn quoted(line: &str) -> Option<&str> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}
