//! Capability probing: audio device and hardware encoder selection.
//!
//! Probing never fails. Any error, timeout or empty result degrades to the
//! documented fallback (video-only capture, software encoder).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::backend::CaptureBackend;
use super::encoder::EncoderProfile;

/// Loopback-style devices preferred for capture, highest rank first
pub const AUDIO_DEVICE_PRIORITY: &[&str] = &["Stereo Mix", "What U Hear", "CABLE Output", "Loopback"];

/// Hardware encoders tried in order before falling back to software
pub const HARDWARE_ENCODER_PRIORITY: &[EncoderProfile] = &[
    EncoderProfile::Nvenc,
    EncoderProfile::Amf,
    EncoderProfile::Qsv,
];

pub const DEVICE_LIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const ENCODER_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing, fixed for the lifetime of a controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub encoder: EncoderProfile,
    pub audio_device: Option<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            encoder: EncoderProfile::Software,
            audio_device: None,
        }
    }
}

pub struct DeviceProbe<'a> {
    backend: &'a dyn CaptureBackend,
    device_timeout: Duration,
    encoder_timeout: Duration,
}

impl<'a> DeviceProbe<'a> {
    pub fn new(backend: &'a dyn CaptureBackend) -> Self {
        Self {
            backend,
            device_timeout: DEVICE_LIST_TIMEOUT,
            encoder_timeout: ENCODER_TEST_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, device_timeout: Duration, encoder_timeout: Duration) -> Self {
        self.device_timeout = device_timeout;
        self.encoder_timeout = encoder_timeout;
        self
    }

    /// Resolve both capabilities
    pub async fn probe(&self) -> Capabilities {
        let encoder = self.resolve_encoder().await;
        let audio_device = self.resolve_audio_device().await;

        info!(
            encoder = %encoder,
            audio_device = audio_device.as_deref().unwrap_or("none"),
            "Capture capabilities resolved"
        );

        Capabilities {
            encoder,
            audio_device,
        }
    }

    pub async fn resolve_audio_device(&self) -> Option<String> {
        let devices = match timeout(self.device_timeout, self.backend.list_audio_devices()).await {
            Ok(Ok(devices)) => devices,
            Ok(Err(e)) => {
                warn!("Audio device enumeration failed, capturing video only: {:#}", e);
                return None;
            }
            Err(_) => {
                warn!(
                    "Audio device enumeration timed out after {:?}, capturing video only",
                    self.device_timeout
                );
                return None;
            }
        };

        let selected = select_audio_device(&devices, AUDIO_DEVICE_PRIORITY);
        if selected.is_none() {
            info!("No audio capture device found, capturing video only");
        }
        selected
    }

    /// First hardware encoder that actually encodes a frame, else software
    pub async fn resolve_encoder(&self) -> EncoderProfile {
        for candidate in HARDWARE_ENCODER_PRIORITY {
            match timeout(self.encoder_timeout, self.backend.test_encoder(candidate)).await {
                Ok(Ok(true)) => {
                    info!("Hardware encoder {} verified", candidate);
                    return *candidate;
                }
                Ok(Ok(false)) => info!("Hardware encoder {} unavailable", candidate),
                Ok(Err(e)) => warn!("Hardware encoder {} test failed: {:#}", candidate, e),
                Err(_) => warn!(
                    "Hardware encoder {} test timed out after {:?}",
                    candidate, self.encoder_timeout
                ),
            }
        }

        info!("Falling back to software encoder {}", EncoderProfile::Software);
        EncoderProfile::Software
    }
}

/// Pick a device by priority term (case-insensitive substring), else the
/// first enumerated device, else none.
///
/// Terms are ranked: a device matching an earlier term wins over one matching
/// a later term, regardless of enumeration order. This is not "the first
/// enumerated device that matches any term": with `["Loopback", "Stereo Mix"]`
/// enumerated and `["stereo mix", "loopback"]` as priority, "Stereo Mix" is
/// picked. Enumeration order only breaks ties within one term.
pub fn select_audio_device(devices: &[String], priority: &[&str]) -> Option<String> {
    let lowered: Vec<String> = devices.iter().map(|d| d.to_lowercase()).collect();

    priority
        .iter()
        .find_map(|term| {
            let term = term.to_lowercase();
            lowered.iter().position(|d| d.contains(&term))
        })
        .map(|idx| devices[idx].clone())
        .or_else(|| devices.first().cloned())
}
