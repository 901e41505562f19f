//! Deterministic filesystem path conventions, so the Startup Reconciler
//! can probe for existence without any extra state.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub output_root: PathBuf,
}

impl MediaConfig {
    pub fn from_env() -> Self {
        let output_root = std::env::var("WANFLOW_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./output"));
        Self { output_root }
    }

    pub fn job_dir(&self, job_id: i64) -> PathBuf {
        self.output_root.join(format!("job_{job_id}"))
    }

    pub fn segment_video_path(&self, job_id: i64, index: i32) -> PathBuf {
        self.job_dir(job_id).join(format!("segment_{index}.mp4"))
    }

    pub fn segment_last_frame_path(&self, job_id: i64, index: i32) -> PathBuf {
        self.job_dir(job_id)
            .join(format!("segment_{index}_last_frame.jpg"))
    }

    pub fn final_video_path(&self, job_id: i64, job_name: &str, timestamp: &str) -> PathBuf {
        self.job_dir(job_id)
            .join(format!("{}_{}.mp4", sanitize_job_name(job_name), timestamp))
    }
}

/// Same alphanumeric+`-_`, collapsed-underscore, stripped sanitization
/// rule used by the Graph Mutator's output prefix (and, here, the
/// finalized-video filename).
pub fn sanitize_job_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    while out.contains("__") {
        out = out.replace("__", "_");
    }
    out.trim_matches('_').to_string()
}

pub fn path_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_special_characters() {
        assert_eq!(sanitize_job_name("My Cool Job!!"), "My_Cool_Job");
    }

    #[test]
    fn segment_paths_are_deterministic() {
        let cfg = MediaConfig {
            output_root: PathBuf::from("/data/output"),
        };
        assert_eq!(
            cfg.segment_video_path(7, 2),
            PathBuf::from("/data/output/job_7/segment_2.mp4")
        );
        assert_eq!(
            cfg.segment_last_frame_path(7, 2),
            PathBuf::from("/data/output/job_7/segment_2_last_frame.jpg")
        );
    }
}
