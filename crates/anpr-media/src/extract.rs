//! Frame extraction via the FFmpeg CLI.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, FrameSet};

/// Extracts timestamped raster frames from a video at a fixed rate.
///
/// Extraction is a one-shot operation: frames are decoded out of a temporary
/// directory that is deleted before this returns, so the resulting
/// [`FrameSet`] is the only copy. Frame indices are global, ordered and start
/// at 0 regardless of how callers batch the frames afterwards.
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    /// Sampling rate passed to FFmpeg's fps filter.
    fps: u32,
    /// Hard ceiling on FFmpeg runtime.
    timeout_secs: u64,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self {
            fps: 1,
            timeout_secs: 120,
        }
    }
}

impl FrameExtractor {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            ..Default::default()
        }
    }

    /// Set the FFmpeg timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Extract all frames from `video` at the configured rate.
    pub async fn extract(&self, video: &Path) -> MediaResult<FrameSet> {
        if !video.exists() {
            return Err(MediaError::FileNotFound(video.to_path_buf()));
        }
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let scratch = tempfile::tempdir()?;
        let pattern = scratch.path().join("frame_%06d.jpg");

        debug!(
            video = %video.display(),
            fps = self.fps,
            "Extracting frames"
        );
        let started = Instant::now();

        let mut child = Command::new("ffmpeg")
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("fps={}", self.fps))
            .arg("-q:v")
            .arg("2")
            .arg(&pattern)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain stderr concurrently so a chatty FFmpeg cannot block on the pipe.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        let status = match tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            child.wait(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    video = %video.display(),
                    timeout_secs = self.timeout_secs,
                    "Frame extraction timed out, killing FFmpeg"
                );
                child.kill().await.ok();
                return Err(MediaError::Timeout(self.timeout_secs));
            }
        };

        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg frame extraction failed",
                Some(stderr_output),
                status.code(),
            ));
        }

        let frames = self.decode_frames(scratch.path()).await?;

        info!(
            video = %video.display(),
            frames = frames.len(),
            fps = self.fps,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Frame extraction complete"
        );

        Ok(FrameSet::new(self.fps, frames))
    }

    /// Decode the extracted JPEGs in filename order, assigning global indices.
    async fn decode_frames(&self, dir: &Path) -> MediaResult<Vec<Frame>> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("frame_") && n.ends_with(".jpg"))
            {
                paths.push(path);
            }
        }
        // FFmpeg numbers outputs sequentially, so lexicographic order is
        // frame order.
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for (index, path) in paths.into_iter().enumerate() {
            let index = index as u64;
            let image = tokio::task::spawn_blocking(move || image::open(&path))
                .await
                .map_err(|e| MediaError::FrameDecode {
                    index,
                    message: e.to_string(),
                })?
                .map_err(|e| MediaError::FrameDecode {
                    index,
                    message: e.to_string(),
                })?
                .to_rgb8();
            frames.push(Frame::new(index, image));
        }
        Ok(frames)
    }
}
