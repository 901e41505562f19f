//! Final-video stitching: a single input is a plain copy; multiple
//! inputs go through ffmpeg's concat demuxer with stream copy, via a
//! temporary manifest file that is always removed.

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use std::path::{Path, PathBuf};
use tokio::fs;

fn escape_manifest_path(path: &Path) -> String {
    // Single-quote escaping for the concat manifest: `'` -> `'\''`.
    path.display().to_string().replace('\'', r"'\''")
}

pub async fn stitch(video_paths: &[PathBuf], dest: &Path) -> MediaResult<()> {
    if video_paths.is_empty() {
        return Err(MediaError::download_failed(
            "no completed segment videos to stitch",
        ));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    if video_paths.len() == 1 {
        fs::copy(&video_paths[0], dest).await?;
        return Ok(());
    }

    let manifest_path = dest.with_extension("concat.txt");
    let mut manifest = String::new();
    for path in video_paths {
        manifest.push_str(&format!("file '{}'\n", escape_manifest_path(path)));
    }
    fs::write(&manifest_path, manifest).await?;

    let cmd = FfmpegCommand::new(&manifest_path, dest)
        .concat_demuxer(true)
        .video_codec_copy();

    let result = FfmpegRunner::new().run(&cmd).await;

    let _ = fs::remove_file(&manifest_path).await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_single_quotes() {
        let p = Path::new("/tmp/it's a video.mp4");
        assert_eq!(escape_manifest_path(p), r"/tmp/it'\''s a video.mp4");
    }
}
