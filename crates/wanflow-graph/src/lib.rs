//! Deterministic computation-graph template mutation for the Renderer's
//! ComfyUI-like wire format: plain `serde_json::Value` manipulation over
//! a checked-in template asset, injecting per-segment parameters and
//! rewiring the LoRA adapter chain.

pub mod error;
pub mod params;
pub mod template;

pub use error::{GraphError, GraphResult};
pub use params::{FaceswapParams, GraphParams, LoraEntry, LoraPair};
pub use template::{build_graph, template};
