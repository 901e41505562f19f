//! Type-safe ffmpeg command building and a runner with optional timeout,
//! trimmed to the subset of flags this pipeline needs.

use crate::error::{MediaError, MediaResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

/// Builds an ffmpeg argument list for a single input -> single output
/// invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// `-sseof <secs>`: seek relative to end of input (negative values
    /// seek backward from EOF), used for last-frame extraction.
    pub fn seek_from_eof(self, secs: f64) -> Self {
        self.input_arg("-sseof").input_arg(format!("{secs}"))
    }

    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    pub fn quality(self, q: u32) -> Self {
        self.output_arg("-q:v").output_arg(format!("{q}"))
    }

    pub fn video_codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    pub fn concat_demuxer(self, safe: bool) -> Self {
        let mut cmd = self.input_arg("-f").input_arg("concat");
        if safe {
            cmd = cmd.input_arg("-safe").input_arg("0");
        }
        cmd
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];
        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.display().to_string());
        args.extend(self.output_args.clone());
        args.push(self.output.display().to_string());
        args
    }
}

/// Runs an `FfmpegCommand`, optionally bounded by a timeout and a
/// cooperative-cancellation watch channel.
#[derive(Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        tracing::debug!(?args, "spawning ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr = child.stderr.take();
        let mut cancel = self.cancel.clone();

        let status = loop {
            let wait_fut = child.wait();
            tokio::select! {
                res = wait_fut => {
                    break res?;
                }
                _ = async { tokio::time::sleep(self.timeout.unwrap_or(Duration::MAX)).await }, if self.timeout.is_some() => {
                    let _ = child.start_kill();
                    return Err(MediaError::Timeout(self.timeout.unwrap().as_secs()));
                }
                _ = async { cancel.as_mut().unwrap().changed().await }, if cancel.is_some() => {
                    if *cancel.as_ref().unwrap().borrow() {
                        let _ = child.start_kill();
                        return Err(MediaError::Cancelled);
                    }
                }
            }
        };

        let mut stderr_buf = String::new();
        if let Some(mut stderr) = stderr.take() {
            use tokio::io::AsyncReadExt;
            let _ = stderr.read_to_string(&mut stderr_buf).await;
        }

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with a non-zero status",
                stderr_buf,
                status.code(),
            ));
        }
        Ok(())
    }
}

pub fn check_ffmpeg() -> bool {
    which::which("ffmpeg").is_ok()
}

pub fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_orders_flags_correctly() {
        let cmd = FfmpegCommand::new("in.mp4", "out.jpg")
            .seek_from_eof(-0.1)
            .single_frame()
            .quality(2);
        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-sseof".to_string()));
        assert!(args.contains(&"-frames:v".to_string()));
        assert_eq!(args.last().unwrap(), "out.jpg");
    }
}
