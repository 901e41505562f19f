//! The Graph Mutator's own parameter record, deliberately independent of
//! `wanflow-models`: this crate only ever sees plain values handed to it
//! by the Orchestrator, never a `Job`/`Segment` row.

/// A single LoRA adapter reference with its blend strength.
#[derive(Debug, Clone, PartialEq)]
pub struct LoraEntry {
    pub file: String,
    pub weight: f64,
}

/// One user LoRA slot: a high-pass entry, a low-pass entry, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoraPair {
    pub high: Option<LoraEntry>,
    pub low: Option<LoraEntry>,
}

impl LoraPair {
    fn is_empty(&self) -> bool {
        self.high.is_none() && self.low.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceswapParams {
    pub enabled: bool,
    pub image: Option<String>,
    pub faces_order: Option<String>,
    pub faces_index: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GraphParams {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub start_image: String,
    pub high_noise_model: String,
    pub low_noise_model: String,
    pub seed: u64,
    pub fps: u32,
    pub output_prefix: String,
    pub faceswap: Option<FaceswapParams>,
    pub loras: Vec<LoraPair>,
}

impl GraphParams {
    /// Non-empty user LoRA pairs, truncated to the 2 available node-id
    /// slots in the template.
    pub(crate) fn active_loras(&self) -> Vec<&LoraPair> {
        self.loras.iter().filter(|p| !p.is_empty()).take(2).collect()
    }
}
