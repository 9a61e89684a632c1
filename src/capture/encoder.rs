use serde::{Deserialize, Serialize};

/// Video encoder used by the capture backend.
///
/// Each variant carries its own fixed parameter set; the sets are not
/// interchangeable between vendors (rate control, latency knobs and pixel
/// format all differ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderProfile {
    /// NVIDIA NVENC
    Nvenc,
    /// AMD AMF
    Amf,
    /// Intel Quick Sync
    Qsv,
    /// libx264, always available
    Software,
}

impl EncoderProfile {
    /// FFmpeg codec name
    pub fn codec(&self) -> &'static str {
        match self {
            EncoderProfile::Nvenc => "h264_nvenc",
            EncoderProfile::Amf => "h264_amf",
            EncoderProfile::Qsv => "h264_qsv",
            EncoderProfile::Software => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, EncoderProfile::Software)
    }

    /// Encoder arguments, starting with `-c:v`.
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            EncoderProfile::Nvenc => &[
                "-c:v", "h264_nvenc",
                "-preset", "p4",
                "-tune", "ll",
                "-rc", "vbr",
                "-cq", "23",
                "-b:v", "0",
                "-pix_fmt", "yuv420p",
            ],
            EncoderProfile::Amf => &[
                "-c:v", "h264_amf",
                "-usage", "lowlatency",
                "-quality", "speed",
                "-rc", "cqp",
                "-qp_i", "23",
                "-qp_p", "23",
                "-pix_fmt", "yuv420p",
            ],
            EncoderProfile::Qsv => &[
                "-c:v", "h264_qsv",
                "-preset", "veryfast",
                "-global_quality", "23",
                "-look_ahead", "0",
                "-pix_fmt", "nv12",
            ],
            EncoderProfile::Software => &[
                "-c:v", "libx264",
                "-preset", "ultrafast",
                "-crf", "23",
                "-pix_fmt", "yuv420p",
            ],
        };

        args.iter().map(|s| s.to_string()).collect()
    }
}

impl std::fmt::Display for EncoderProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.codec())
    }
}
