//! Technical metadata extraction via ffprobe.
//!
//! Probing is best-effort: a missing ffprobe binary or an unreadable
//! file yields an error the scanner downgrades to a record without
//! technical metadata, never a failed scan.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe exited with {status} for {path}")]
    Failed { status: std::process::ExitStatus, path: String },
    #[error("unparseable ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Technical metadata for one media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResult {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub bit_rate: Option<i64>,
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

/// Run ffprobe against `path` and collect the fields the catalog
/// stores. The first video and first audio stream win.
pub fn probe_file(path: &Path) -> Result<ProbeResult, ProbeError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        return Err(ProbeError::Failed {
            status: output.status,
            path: path.display().to_string(),
        });
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(collect(parsed))
}

fn collect(parsed: FfprobeOutput) -> ProbeResult {
    let mut result = ProbeResult::default();

    for stream in &parsed.streams {
        match stream.codec_type.as_deref() {
            Some("video") if result.video_codec.is_none() => {
                result.video_codec = stream.codec_name.clone();
                result.width = stream.width;
                result.height = stream.height;
                result.frame_rate = stream
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_fraction)
                    .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_fraction));
            }
            Some("audio") if result.audio_codec.is_none() => {
                result.audio_codec = stream.codec_name.clone();
            }
            _ => {}
        }
    }

    if let Some(format) = &parsed.format {
        result.duration = format.duration.as_deref().and_then(|d| d.parse().ok());
        result.bit_rate = format.bit_rate.as_deref().and_then(|b| b.parse().ok());
    }

    result
}

/// ffprobe reports frame rates as fractions like "30000/1001".
fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => s.parse().ok(),
    }
}
