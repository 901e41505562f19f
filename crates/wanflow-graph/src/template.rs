//! Deterministic template mutation + LoRA chain insertion over the
//! checked-in graph asset.

use crate::error::{GraphError, GraphResult};
use crate::params::GraphParams;
use serde_json::{json, Value};

/// The template is a static data structure with stable node identifiers;
/// a template bump is one file to change.
const TEMPLATE_JSON: &str = include_str!("../assets/wan_i2v_workflow.json");

const NODE_NEGATIVE: &str = "89";
const NODE_POSITIVE: &str = "93";
const NODE_LOAD_IMAGE: &str = "97";
const NODE_I2V: &str = "98";
const NODE_UNET_HIGH: &str = "95";
const NODE_UNET_LOW: &str = "96";
const NODE_ACCEL_HIGH: &str = "101";
const NODE_ACCEL_LOW: &str = "102";
const NODE_SEED: &str = "86";
const NODE_FPS: &str = "94";
const NODE_SAVE: &str = "108";
const NODE_FACESWAP: &str = "150";

const LORA_NODE_IDS_HIGH: [&str; 2] = ["118", "120"];
const LORA_NODE_IDS_LOW: [&str; 2] = ["119", "121"];

/// Parse the embedded template asset. Called once per `build_graph`
/// invocation rather than cached: the template is small enough that
/// caching it behind a `OnceCell` isn't worth the extra dependency.
pub fn template() -> GraphResult<Value> {
    serde_json::from_str(TEMPLATE_JSON)
        .map_err(|e| GraphError::TemplateMalformed(e.to_string()))
}

fn node_mut<'a>(graph: &'a mut Value, id: &'static str) -> GraphResult<&'a mut Value> {
    graph
        .get_mut(id)
        .ok_or(GraphError::MissingNode(id))
}

fn inputs_mut<'a>(graph: &'a mut Value, id: &'static str) -> GraphResult<&'a mut serde_json::Map<String, Value>> {
    node_mut(graph, id)?
        .get_mut("inputs")
        .and_then(Value::as_object_mut)
        .ok_or(GraphError::MissingNode(id))
}

fn insert_node(graph: &mut Value, id: &str, node: Value) -> GraphResult<()> {
    graph
        .as_object_mut()
        .ok_or_else(|| GraphError::TemplateMalformed("template root is not an object".into()))?
        .insert(id.to_string(), node);
    Ok(())
}

/// Alphanumeric plus `-_`, collapsed underscores, stripped leading and
/// trailing underscores.
fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
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

/// Build a ready-to-submit graph from a deep copy of `template` and a
/// parameter record.
pub fn build_graph(template: &Value, params: &GraphParams) -> GraphResult<Value> {
    let mut graph = template.clone();

    // Positive/negative prompt (node 93 always; node 89 only if non-empty,
    // preserving the template's own default negative prompt otherwise).
    inputs_mut(&mut graph, NODE_POSITIVE)?.insert("text".into(), json!(params.prompt));
    if let Some(negative) = params.negative_prompt.as_deref().filter(|s| !s.is_empty()) {
        inputs_mut(&mut graph, NODE_NEGATIVE)?.insert("text".into(), json!(negative));
    }

    // Start image.
    inputs_mut(&mut graph, NODE_LOAD_IMAGE)?.insert("image".into(), json!(params.start_image));

    // Dimensions and frame count.
    {
        let i2v = inputs_mut(&mut graph, NODE_I2V)?;
        i2v.insert("width".into(), json!(params.width));
        i2v.insert("height".into(), json!(params.height));
        i2v.insert("length".into(), json!(params.frames));
    }

    // Noise-model filenames.
    inputs_mut(&mut graph, NODE_UNET_HIGH)?.insert("unet_name".into(), json!(params.high_noise_model));
    inputs_mut(&mut graph, NODE_UNET_LOW)?.insert("unet_name".into(), json!(params.low_noise_model));

    // Seed, written only to the high-noise-pass sampler (node 86), exactly
    // as the source's single `noise_seed` override.
    inputs_mut(&mut graph, NODE_SEED)?.insert("noise_seed".into(), json!(params.seed));

    // LoRA chain: insert user pairs between the UNET loaders and the fixed
    // acceleration LoRA nodes, then rewire the acceleration nodes' `model`
    // input to the new chain tail. Untouched when no pairs are active.
    let active = params.active_loras();
    if !active.is_empty() {
        let mut last_high = NODE_UNET_HIGH.to_string();
        let mut last_low = NODE_UNET_LOW.to_string();

        for (i, pair) in active.into_iter().enumerate() {
            if let Some(entry) = &pair.high {
                let node_id = LORA_NODE_IDS_HIGH[i];
                insert_node(
                    &mut graph,
                    node_id,
                    json!({
                        "class_type": "LoraLoaderModelOnly",
                        "inputs": {
                            "lora_name": entry.file,
                            "strength_model": entry.weight,
                            "model": [last_high, 0]
                        },
                        "_meta": { "title": format!("User LoRA {} High", i + 1) }
                    }),
                )?;
                last_high = node_id.to_string();
            }
            if let Some(entry) = &pair.low {
                let node_id = LORA_NODE_IDS_LOW[i];
                insert_node(
                    &mut graph,
                    node_id,
                    json!({
                        "class_type": "LoraLoaderModelOnly",
                        "inputs": {
                            "lora_name": entry.file,
                            "strength_model": entry.weight,
                            "model": [last_low, 0]
                        },
                        "_meta": { "title": format!("User LoRA {} Low", i + 1) }
                    }),
                )?;
                last_low = node_id.to_string();
            }
        }

        inputs_mut(&mut graph, NODE_ACCEL_HIGH)?.insert("model".into(), json!([last_high, 0]));
        inputs_mut(&mut graph, NODE_ACCEL_LOW)?.insert("model".into(), json!([last_low, 0]));
    }

    // FPS.
    inputs_mut(&mut graph, NODE_FPS)?.insert("fps".into(), json!(params.fps));

    // Sanitized output prefix; empty prefix falls back to the template's
    // own default.
    let prefix = if params.output_prefix.is_empty() {
        "ComfyUI".to_string()
    } else {
        sanitize_filename(&params.output_prefix)
    };
    inputs_mut(&mut graph, NODE_SAVE)?.insert("filename_prefix".into(), json!(prefix));

    // Faceswap: set image/ordering only when enabled; otherwise the
    // template's disabled default is left untouched.
    if let Some(faceswap) = &params.faceswap {
        if faceswap.enabled {
            let node = inputs_mut(&mut graph, NODE_FACESWAP)?;
            node.insert("enabled".into(), json!(true));
            if let Some(image) = &faceswap.image {
                node.insert("source_image".into(), json!(image));
            }
            if let Some(order) = &faceswap.faces_order {
                node.insert("faces_order".into(), json!(order));
            }
            if let Some(index) = &faceswap.faces_index {
                node.insert("faces_index".into(), json!(index));
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FaceswapParams, LoraEntry, LoraPair};

    fn base_params() -> GraphParams {
        GraphParams {
            prompt: "a cat runs".into(),
            negative_prompt: None,
            width: 640,
            height: 640,
            frames: 81,
            start_image: "img.jpg".into(),
            high_noise_model: "high.safetensors".into(),
            low_noise_model: "low.safetensors".into(),
            seed: 42,
            fps: 16,
            output_prefix: "My Cool Job!!".into(),
            faceswap: None,
            loras: Vec::new(),
        }
    }

    #[test]
    fn sanitizes_output_prefix_like_source() {
        assert_eq!(sanitize_filename("My Cool Job!!"), "My_Cool_Job");
        assert_eq!(sanitize_filename("a__b___c"), "a_b_c");
        assert_eq!(sanitize_filename("__lead_trail__"), "lead_trail");
    }

    #[test]
    fn writes_core_fields() {
        let template = template().unwrap();
        let params = base_params();
        let graph = build_graph(&template, &params).unwrap();

        assert_eq!(graph["93"]["inputs"]["text"], json!("a cat runs"));
        assert_eq!(graph["97"]["inputs"]["image"], json!("img.jpg"));
        assert_eq!(graph["98"]["inputs"]["width"], json!(640));
        assert_eq!(graph["98"]["inputs"]["length"], json!(81));
        assert_eq!(graph["86"]["inputs"]["noise_seed"], json!(42));
        assert_eq!(graph["94"]["inputs"]["fps"], json!(16));
        assert_eq!(graph["108"]["inputs"]["filename_prefix"], json!("My_Cool_Job"));
        // Negative prompt left at template default since none was supplied.
        assert!(graph["89"]["inputs"]["text"].as_str().unwrap().len() > 0);
    }

    #[test]
    fn empty_negative_prompt_leaves_template_default() {
        let template = template().unwrap();
        let mut params = base_params();
        params.negative_prompt = Some(String::new());
        let default_negative = template["89"]["inputs"]["text"].clone();
        let graph = build_graph(&template, &params).unwrap();
        assert_eq!(graph["89"]["inputs"]["text"], default_negative);
    }

    #[test]
    fn no_loras_leaves_default_wiring() {
        let template = template().unwrap();
        let params = base_params();
        let graph = build_graph(&template, &params).unwrap();
        assert_eq!(graph["101"]["inputs"]["model"], json!(["95", 0]));
        assert_eq!(graph["102"]["inputs"]["model"], json!(["96", 0]));
        assert!(graph.get("118").is_none());
    }

    /// [(hA, lA), (hB, _)] wires
    /// high: UNET_high -> hA -> hB -> accel_high
    /// low: UNET_low -> lA -> accel_low
    #[test]
    fn lora_chain_correctness_scenario() {
        let template = template().unwrap();
        let mut params = base_params();
        params.loras = vec![
            LoraPair {
                high: Some(LoraEntry { file: "hA.safetensors".into(), weight: 0.8 }),
                low: Some(LoraEntry { file: "lA.safetensors".into(), weight: 0.9 }),
            },
            LoraPair {
                high: Some(LoraEntry { file: "hB.safetensors".into(), weight: 1.0 }),
                low: None,
            },
        ];
        let graph = build_graph(&template, &params).unwrap();

        // hA (node 118) reads from UNET high (95).
        assert_eq!(graph["118"]["inputs"]["model"], json!(["95", 0]));
        assert_eq!(graph["118"]["inputs"]["lora_name"], json!("hA.safetensors"));
        assert_eq!(graph["118"]["inputs"]["strength_model"], json!(0.8));
        // hB (node 120) reads from hA (118).
        assert_eq!(graph["120"]["inputs"]["model"], json!(["118", 0]));
        // Acceleration high (101) now reads from hB (120).
        assert_eq!(graph["101"]["inputs"]["model"], json!(["120", 0]));

        // lA (node 119) reads from UNET low (96).
        assert_eq!(graph["119"]["inputs"]["model"], json!(["96", 0]));
        assert_eq!(graph["119"]["inputs"]["strength_model"], json!(0.9));
        // No low-side entry for the second pair, so node 121 never exists.
        assert!(graph.get("121").is_none());
        // Acceleration low (102) reads from lA (119) since it was the last
        // low-side node emitted.
        assert_eq!(graph["102"]["inputs"]["model"], json!(["119", 0]));
    }

    #[test]
    fn third_lora_pair_is_silently_ignored() {
        let template = template().unwrap();
        let mut params = base_params();
        params.loras = vec![
            LoraPair { high: Some(LoraEntry { file: "a".into(), weight: 1.0 }), low: None },
            LoraPair { high: Some(LoraEntry { file: "b".into(), weight: 1.0 }), low: None },
            LoraPair { high: Some(LoraEntry { file: "c".into(), weight: 1.0 }), low: None },
        ];
        let graph = build_graph(&template, &params).unwrap();
        assert_eq!(graph["101"]["inputs"]["model"], json!(["120", 0]));
        assert!(graph.get("122").is_none());
    }

    #[test]
    fn determinism_byte_identical_for_identical_inputs() {
        let template = template().unwrap();
        let params = base_params();
        let a = serde_json::to_vec(&build_graph(&template, &params).unwrap()).unwrap();
        let b = serde_json::to_vec(&build_graph(&template, &params).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn faceswap_sets_fields_only_when_enabled() {
        let template = template().unwrap();
        let mut params = base_params();
        params.faceswap = Some(FaceswapParams {
            enabled: true,
            image: Some("face.jpg".into()),
            faces_order: Some("small-large".into()),
            faces_index: Some("1".into()),
        });
        let graph = build_graph(&template, &params).unwrap();
        assert_eq!(graph["150"]["inputs"]["enabled"], json!(true));
        assert_eq!(graph["150"]["inputs"]["source_image"], json!("face.jpg"));
        assert_eq!(graph["150"]["inputs"]["faces_order"], json!("small-large"));
    }

    #[test]
    fn faceswap_disabled_by_default_leaves_template_node() {
        let template = template().unwrap();
        let params = base_params();
        let graph = build_graph(&template, &params).unwrap();
        assert_eq!(graph["150"]["inputs"]["enabled"], json!(false));
    }
}
