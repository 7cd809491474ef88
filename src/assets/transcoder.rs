//! External transcoder interface.
//!
//! The core never links a media codec; it shells out to a configured
//! transcoder binary with three operations: probe (validate a file and
//! inspect its streams), mux (combine an audio and a video track) and frame
//! extraction (for video thumbnails). The defaults are ffmpeg/ffprobe but
//! nothing beyond this command interface is assumed.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::MediaError;

#[derive(Debug, Clone)]
pub struct Transcoder {
    bin: PathBuf,
    probe_bin: PathBuf,
}

impl Transcoder {
    /// Resolve the transcoder binaries on the host.
    ///
    /// Missing binaries are fatal to the asset extraction stage; there is no
    /// retry loop around this.
    pub fn discover(bin: &str, probe_bin: &str) -> Result<Self, MediaError> {
        let bin = which::which(bin)
            .map_err(|_| MediaError::TranscoderUnavailable(bin.to_string()))?;
        let probe_bin = which::which(probe_bin)
            .map_err(|_| MediaError::TranscoderUnavailable(probe_bin.to_string()))?;
        Ok(Self { bin, probe_bin })
    }

    /// Construct from explicit paths (tests).
    #[cfg(test)]
    pub fn from_paths(bin: PathBuf, probe_bin: PathBuf) -> Self {
        Self { bin, probe_bin }
    }

    /// Whether the file is a decodable media container.
    pub async fn probe_valid(&self, path: &Path) -> Result<bool, MediaError> {
        let output = Command::new(&self.probe_bin)
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration,format_name"])
            .args(["-select_streams", "v:0"])
            .args(["-show_entries", "stream=codec_name"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(output.status.success() && !String::from_utf8_lossy(&output.stdout).trim().is_empty())
    }

    /// Whether the file carries an audio stream.
    pub async fn has_audio_stream(&self, path: &Path) -> Result<bool, MediaError> {
        let output = Command::new(&self.probe_bin)
            .args(["-v", "error"])
            .args(["-select_streams", "a"])
            .args(["-show_entries", "stream=codec_type"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).contains("audio"))
    }

    /// Combine an audio and a video track into one container.
    ///
    /// Video is stream-copied; audio is transcoded to AAC for compatibility.
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MediaError> {
        let result = Command::new(&self.bin)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy"])
            .args(["-c:a", "aac"])
            .args(["-strict", "experimental"])
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;
        if !result.status.success() {
            return Err(MediaError::TranscoderFailed(format!(
                "mux of {} + {} failed: {}",
                video.display(),
                audio.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        if !output.exists() {
            return Err(MediaError::TranscoderFailed(format!(
                "mux reported success but {} is missing",
                output.display()
            )));
        }
        Ok(())
    }

    /// Extract one frame of a video to an image file.
    pub async fn extract_frame(
        &self,
        input: &Path,
        frame_index: u32,
        output: &Path,
    ) -> Result<(), MediaError> {
        let result = Command::new(&self.bin)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-vf", &format!("select=eq(n\\,{})", frame_index)])
            .args(["-frames:v", "1"])
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await?;
        if !result.status.success() || !output.exists() {
            return Err(MediaError::TranscoderFailed(format!(
                "frame {} extraction from {} failed",
                frame_index,
                input.display()
            )));
        }
        Ok(())
    }
}
