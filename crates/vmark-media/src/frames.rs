//! Raw RGB frame decode/encode over FFmpeg pipes.
//!
//! Frames cross the process boundary as packed RGB24: the decoder streams
//! `width * height * 3` byte chunks from FFmpeg's stdout, and the encoder
//! feeds the same layout back into a second FFmpeg process that writes a
//! browser-playable H.264 MP4.

use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// One decoded frame of packed RGB24 pixels.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 3],
        }
    }
}

/// Streaming decoder: one FFmpeg process emitting rawvideo on stdout.
pub struct FrameDecoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    frame_bytes: usize,
    width: u32,
    height: u32,
}

impl FrameDecoder {
    /// Spawn the decode process for a probed video.
    pub fn spawn(path: &Path, info: &VideoInfo) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(path = %path.display(), "Spawning FFmpeg decoder");

        let mut child = cmd
            .spawn()
            .map_err(|e| MediaError::decode_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::decode_failed("Failed to capture FFmpeg stdout", None, None))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            frame_bytes: info.frame_bytes(),
            width: info.width,
            height: info.height,
        })
    }

    /// Read the next frame. Returns `None` on clean end of stream; a chunk
    /// that ends mid-frame is a decode error.
    pub async fn next_frame(&mut self) -> MediaResult<Option<RgbFrame>> {
        let mut data = vec![0u8; self.frame_bytes];
        let mut filled = 0usize;

        while filled < self.frame_bytes {
            let n = self
                .stdout
                .read(&mut data[filled..])
                .await
                .map_err(|e| MediaError::decode_failed(format!("Failed to read frame data: {}", e), None, None))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < self.frame_bytes {
            return Err(MediaError::decode_failed(
                format!("Truncated frame: got {} of {} bytes", filled, self.frame_bytes),
                None,
                None,
            ));
        }

        Ok(Some(RgbFrame {
            width: self.width,
            height: self.height,
            data,
        }))
    }

    /// Wait for the decode process and surface its stderr on failure.
    pub async fn finish(mut self) -> MediaResult<()> {
        let stderr = read_stderr(&mut self.child).await;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| MediaError::decode_failed(format!("FFmpeg process error: {}", e), None, None))?;

        if !status.success() {
            warn!(?status, "FFmpeg decoder exited with error");
            return Err(MediaError::decode_failed(
                "FFmpeg decode failed",
                stderr,
                status.code(),
            ));
        }
        Ok(())
    }
}

/// Streaming encoder: rawvideo frames in on stdin, H.264 MP4 out.
pub struct FrameEncoder {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    frame_bytes: usize,
}

impl FrameEncoder {
    /// Spawn the encode process writing to `output`.
    pub fn spawn(output: &Path, width: u32, height: u32, fps: f64) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", width, height),
            "-r",
            &format!("{:.4}", fps),
            "-i",
            "-",
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-crf",
            "23",
            // yuv420p + faststart so browsers can play and seek the result
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-y",
        ])
        .arg(output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        debug!(output = %output.display(), width, height, fps, "Spawning FFmpeg encoder");

        let mut child = cmd
            .spawn()
            .map_err(|e| MediaError::encode_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::encode_failed("Failed to capture FFmpeg stdin", None, None))?;

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            frame_bytes: width as usize * height as usize * 3,
        })
    }

    /// Write one frame to the encoder.
    pub async fn write_frame(&mut self, frame: &RgbFrame) -> MediaResult<()> {
        if frame.data.len() != self.frame_bytes {
            return Err(MediaError::encode_failed(
                format!(
                    "Frame size mismatch: got {} bytes, expected {}",
                    frame.data.len(),
                    self.frame_bytes
                ),
                None,
                None,
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::encode_failed("Encoder already finished", None, None))?;
        stdin
            .write_all(&frame.data)
            .await
            .map_err(|e| MediaError::encode_failed(format!("Failed to write frame data: {}", e), None, None))?;
        Ok(())
    }

    /// Close stdin, wait for the encode to complete, and surface stderr on
    /// failure.
    pub async fn finish(mut self) -> MediaResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .await
                .map_err(|e| MediaError::encode_failed(format!("Failed to flush encoder: {}", e), None, None))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| MediaError::encode_failed(format!("Failed to close encoder stdin: {}", e), None, None))?;
            // Drop closes the pipe so FFmpeg sees EOF and finalizes the file.
            drop(stdin);
        }

        let stderr = read_stderr(&mut self.child).await;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| MediaError::encode_failed(format!("FFmpeg process error: {}", e), None, None))?;

        if !status.success() {
            warn!(?status, "FFmpeg encoder exited with error");
            return Err(MediaError::encode_failed(
                "FFmpeg encode failed",
                stderr,
                status.code(),
            ));
        }
        Ok(())
    }
}

async fn read_stderr(child: &mut Child) -> Option<String> {
    let mut stderr_pipe = child.stderr.take()?;
    let mut buf = String::new();
    stderr_pipe.read_to_string(&mut buf).await.ok()?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_frame_allocation() {
        let frame = RgbFrame::new(4, 2);
        assert_eq!(frame.data.len(), 4 * 2 * 3);
        assert!(frame.data.iter().all(|b| *b == 0));
    }
}
