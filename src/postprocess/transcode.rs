use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use error_stack::{IntoReport, Report, ResultExt};

use crate::config::MusicFormat;
use crate::postprocess::{TranscodeFailed, TranscodeResult, Transcoder};

const SAMPLE_RATE: &str = "44100";
const CHANNELS: &str = "2";

/// Transcodes with the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Finds `ffmpeg` on the `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    fn arguments(input: &Path, output: &Path, format: MusicFormat, bitrate: &str) -> Vec<OsString> {
        let codec = match format {
            MusicFormat::Mp3 => "libmp3lame",
            MusicFormat::Ogg => "libvorbis",
        };
        let mut arguments: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-f", "ogg", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        arguments.push(input.as_os_str().to_os_string());
        arguments.extend(
            [
                "-vn",
                "-ar",
                SAMPLE_RATE,
                "-ac",
                CHANNELS,
                "-c:a",
                codec,
                "-b:a",
                bitrate,
                "-f",
            ]
            .iter()
            .map(OsString::from),
        );
        arguments.push(OsString::from(format.to_string()));
        arguments.push(output.as_os_str().to_os_string());
        arguments
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, path: &Path, format: MusicFormat, bitrate: &str) -> TranscodeResult<()> {
        let partial_path = partial_path(path);
        let output = Command::new(&self.binary)
            .args(Self::arguments(path, &partial_path, format, bitrate))
            .output()
            .into_report()
            .attach_printable(format!("Failed to run {}", self.binary.display()))
            .change_context(TranscodeFailed)?;
        if !output.status.success() {
            let _ = fs::remove_file(&partial_path);
            return Err(Report::new(TranscodeFailed).attach_printable(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if let Err(err) = fs::rename(&partial_path, path) {
            let _ = fs::remove_file(&partial_path);
            return Err(err)
                .into_report()
                .attach_printable(format!("Failed to replace {}", path.display()))
                .change_context(TranscodeFailed);
        }
        Ok(())
    }
}

/// Sibling file the encoder writes to before it replaces the input.
fn partial_path(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(".part");
    path.with_file_name(file_name)
}
