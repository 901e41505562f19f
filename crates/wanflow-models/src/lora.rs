//! LoRA pair representation, with read-compatibility for the three
//! historical serialization forms: a bare filename string, a JSON array
//! of filename strings, and a JSON array of `{file, weight}` objects.
//! Writes always emit the object-array form.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single LoRA adapter reference with its blend strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraEntry {
    pub file: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Zero or more LoRA entries for one noise-model pass. The Graph Mutator
/// only ever honors the first two; the Store persists whatever is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoraSlot(pub Vec<LoraEntry>);

impl LoraSlot {
    pub fn empty() -> Self {
        LoraSlot(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LoraSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_none();
        }
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for entry in &self.0 {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

struct LoraSlotVisitor;

impl<'de> Visitor<'de> for LoraSlotVisitor {
    type Value = LoraSlot;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, a filename string, or an array of filenames/lora objects")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(LoraSlot::empty())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(LoraSlot::empty())
    }

    // Legacy: a single bare filename string.
    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.is_empty() {
            return Ok(LoraSlot::empty());
        }
        Ok(LoraSlot(vec![LoraEntry {
            file: v.to_string(),
            weight: 1.0,
        }]))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            match value {
                serde_json::Value::String(file) => entries.push(LoraEntry { file, weight: 1.0 }),
                serde_json::Value::Object(obj) => {
                    let file = obj
                        .get("file")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string());
                    if let Some(file) = file {
                        let weight = obj.get("weight").and_then(|v| v.as_f64()).unwrap_or(1.0);
                        entries.push(LoraEntry { file, weight });
                    }
                }
                serde_json::Value::Null => {}
                other => {
                    return Err(de::Error::custom(format!(
                        "unexpected lora entry: {other}"
                    )))
                }
            }
        }
        Ok(LoraSlot(entries))
    }
}

impl<'de> Deserialize<'de> for LoraSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LoraSlotVisitor)
    }
}

/// Parse a `LoraSlot` from the raw TEXT stored in a `job_segments.*_lora`
/// column, tolerating the legacy plain-filename form that is not valid
/// JSON at all.
pub fn parse_lora_column(raw: Option<&str>) -> LoraSlot {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        _ => return LoraSlot::empty(),
    };
    if raw.trim_start().starts_with('[') {
        if let Ok(slot) = serde_json::from_str::<LoraSlot>(raw) {
            return slot;
        }
    }
    // Fall back to treating the whole value as a single legacy filename.
    LoraSlot(vec![LoraEntry {
        file: raw.to_string(),
        weight: 1.0,
    }])
}

/// Serialize a `LoraSlot` to the column's TEXT representation, or `None`
/// when empty (matching the source's `serialize_loras` returning `None`).
pub fn serialize_lora_column(slot: &LoraSlot) -> Option<String> {
    if slot.is_empty() {
        return None;
    }
    serde_json::to_string(slot).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_plain_filename() {
        let slot = parse_lora_column(Some("wan2.2/lora.safetensors"));
        assert_eq!(slot.0.len(), 1);
        assert_eq!(slot.0[0].file, "wan2.2/lora.safetensors");
        assert_eq!(slot.0[0].weight, 1.0);
    }

    #[test]
    fn parses_old_array_of_strings() {
        let slot = parse_lora_column(Some(r#"["a.safetensors", "b.safetensors"]"#));
        assert_eq!(slot.0.len(), 2);
        assert_eq!(slot.0[1].file, "b.safetensors");
    }

    #[test]
    fn parses_new_array_of_objects() {
        let slot = parse_lora_column(Some(r#"[{"file": "a.safetensors", "weight": 0.8}]"#));
        assert_eq!(slot.0[0].weight, 0.8);
    }

    #[test]
    fn parses_none_as_empty() {
        assert!(parse_lora_column(None).is_empty());
    }

    #[test]
    fn round_trip_always_writes_object_form() {
        let slot = parse_lora_column(Some("legacy.safetensors"));
        let written = serialize_lora_column(&slot).unwrap();
        assert!(written.starts_with('['));
        assert!(written.contains("\"weight\""));
    }

    #[test]
    fn empty_slot_serializes_to_none() {
        assert_eq!(serialize_lora_column(&LoraSlot::empty()), None);
    }
}
