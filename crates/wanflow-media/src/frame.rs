//! Last-frame extraction via a single ffmpeg invocation:
//! `ffmpeg -y -sseof -0.1 -i <video> -frames:v 1 -q:v 2 <image>`.

use crate::command::{remove_if_exists, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use std::path::Path;

pub async fn extract_last_frame(video: &Path, image: &Path) -> MediaResult<()> {
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }
    if let Some(parent) = image.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Remove any stale output first so a failed run can't be mistaken for
    // a fresh success.
    remove_if_exists(image)?;

    let cmd = FfmpegCommand::new(video, image)
        .seek_from_eof(-0.1)
        .single_frame()
        .quality(2);

    FfmpegRunner::new().run(&cmd).await?;

    if !image.exists() {
        return Err(MediaError::ffmpeg_failed(
            "ffmpeg exited cleanly but produced no output file",
            "",
            Some(0),
        ));
    }
    Ok(())
}
