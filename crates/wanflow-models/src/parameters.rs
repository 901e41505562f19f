//! The per-job parameter bag: typed fields for the generation knobs the
//! orchestrator always needs, plus a freeform `extra` map for
//! forward-compatible keys the source stored loosely.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Faceswap is an external, optional post-processing block; this system
/// only passes its settings through to the Graph Mutator when enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceswapConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_index: Option<String>,
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    768
}

fn default_fps() -> u32 {
    16
}

fn default_segment_duration() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBag {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_segment_duration")]
    pub segment_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faceswap: Option<FaceswapConfig>,
    /// Forward-compatible keys not yet promoted to a typed field:
    /// recognized (not exhaustive) keys are `steps`, `cfg`, `sampler`,
    /// `scheduler`, `checkpoint`.
    #[serde(default, flatten)]
    pub extra: Map<String, serde_json::Value>,
}

impl Default for ParameterBag {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            segment_duration_seconds: default_segment_duration(),
            faceswap: None,
            extra: Map::new(),
        }
    }
}

impl ParameterBag {
    /// Frames for this job's segments at its configured fps, matching the
    /// source's `SEGMENT_DURATIONS` table (3s->49, 4s->65, 5s->81 @16fps):
    /// `frames = fps * duration_seconds + 1` (one extra frame so the last
    /// still lands cleanly on a frame boundary).
    pub fn frame_count(&self) -> u32 {
        self.fps * self.segment_duration_seconds + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_count_matches_source_table() {
        let bag = ParameterBag::default();
        assert_eq!(bag.frame_count(), 81);
    }

    #[test]
    fn extra_keys_round_trip() {
        let json = r#"{"width":640,"height":640,"fps":16,"segment_duration_seconds":4,"steps":20,"cfg":3.5}"#;
        let bag: ParameterBag = serde_json::from_str(json).unwrap();
        assert_eq!(bag.extra.get("steps").unwrap(), 20);
        let out = serde_json::to_string(&bag).unwrap();
        assert!(out.contains("\"steps\":20"));
    }
}
