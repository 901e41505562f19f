//! Bridges the Store's persisted `Job`/`Segment` rows into the Graph
//! Mutator's own parameter record.

use wanflow_graph::{FaceswapParams, GraphParams, LoraEntry as GraphLoraEntry, LoraPair};
use wanflow_models::{FaceswapConfig, LoraSlot, Segment};

/// Zips a segment's high/low LoRA slots into the node-ordered pairs the
/// Graph Mutator expects, truncated to 2 (the template's node-id budget;
/// `GraphParams::active_loras` also enforces this, this just avoids
/// building pairs that can never be used).
fn zip_lora_pairs(high: &LoraSlot, low: &LoraSlot) -> Vec<LoraPair> {
    let len = high.0.len().max(low.0.len()).min(2);
    (0..len)
        .map(|i| LoraPair {
            high: high.0.get(i).map(|e| GraphLoraEntry {
                file: e.file.clone(),
                weight: e.weight,
            }),
            low: low.0.get(i).map(|e| GraphLoraEntry {
                file: e.file.clone(),
                weight: e.weight,
            }),
        })
        .collect()
}

fn faceswap_params(cfg: &Option<FaceswapConfig>) -> Option<FaceswapParams> {
    cfg.as_ref().map(|c| FaceswapParams {
        enabled: c.enabled,
        image: c.image.clone(),
        faces_order: c.faces_order.clone(),
        faces_index: c.faces_index.clone(),
    })
}

/// Builds the Graph Mutator's input for one segment submission. The
/// caller is responsible for having already confirmed `segment.prompt`
/// and `segment.start_image` are present.
pub fn build_graph_params(
    job: &wanflow_models::Job,
    segment: &Segment,
    high_noise_model: String,
    low_noise_model: String,
) -> GraphParams {
    GraphParams {
        prompt: segment.prompt.clone().unwrap_or_default(),
        negative_prompt: job.negative_prompt.clone(),
        width: job.parameters.width,
        height: job.parameters.height,
        frames: job.parameters.frame_count(),
        start_image: segment.start_image.clone().unwrap_or_default(),
        high_noise_model,
        low_noise_model,
        seed: job.seed,
        fps: job.parameters.fps,
        output_prefix: job.name.clone(),
        faceswap: faceswap_params(&job.parameters.faceswap),
        loras: zip_lora_pairs(&segment.high_lora, &segment.low_lora),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wanflow_models::LoraEntry;

    #[test]
    fn zips_mismatched_slot_lengths() {
        let high = LoraSlot(vec![
            LoraEntry { file: "hA".into(), weight: 1.0 },
            LoraEntry { file: "hB".into(), weight: 0.5 },
        ]);
        let low = LoraSlot(vec![LoraEntry { file: "lA".into(), weight: 1.0 }]);
        let pairs = zip_lora_pairs(&high, &low);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].high.as_ref().unwrap().file, "hA");
        assert_eq!(pairs[0].low.as_ref().unwrap().file, "lA");
        assert!(pairs[1].low.is_none());
        assert_eq!(pairs[1].high.as_ref().unwrap().file, "hB");
    }

    #[test]
    fn truncates_to_two_pairs() {
        let high = LoraSlot(vec![
            LoraEntry { file: "a".into(), weight: 1.0 },
            LoraEntry { file: "b".into(), weight: 1.0 },
            LoraEntry { file: "c".into(), weight: 1.0 },
        ]);
        let pairs = zip_lora_pairs(&high, &LoraSlot::empty());
        assert_eq!(pairs.len(), 2);
    }
}
