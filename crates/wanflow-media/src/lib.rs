//! ffmpeg-backed media pipeline: download a rendered segment, extract its
//! last frame, and stitch completed segments into a final video.

pub mod command;
pub mod download;
pub mod error;
pub mod frame;
pub mod paths;
pub mod stitch;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use download::download;
pub use error::{MediaError, MediaResult};
pub use frame::extract_last_frame;
pub use paths::{sanitize_job_name, MediaConfig};
pub use stitch::stitch;
