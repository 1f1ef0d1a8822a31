use anyhow::Context;
use burrow_protocol_core::types::VarInt;
use burrow_protocol_core::{PacketWrapper, TransformResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Registry ID changes between 1.19.4 and 1.20.
///
/// Loaded from a JSON file of the form
/// `{"items": {"812": 815}, "blocks": {...}, "blockstates": {...}}`.
/// IDs missing from a table map to themselves.
#[derive(Debug, Default, Deserialize)]
pub struct MappingData {
    #[serde(default)]
    items: HashMap<i32, i32>,
    #[serde(default)]
    blocks: HashMap<i32, i32>,
    #[serde(default, rename = "blockstates")]
    block_states: HashMap<i32, i32>,
    #[serde(skip)]
    items_reverse: HashMap<i32, i32>,
}

impl MappingData {
    /// Every ID maps to itself.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let mut data: MappingData = serde_json::from_str(json)?;
        data.items_reverse = data.items.iter().map(|(old, new)| (*new, *old)).collect();
        Ok(data)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mappings from {}", path.display()))?;
        let data = Self::from_json(&json)
            .with_context(|| format!("Failed to parse mappings in {}", path.display()))?;
        info!(
            "Loaded mappings from {}: {} items, {} blocks, {} block states",
            path.display(),
            data.items.len(),
            data.blocks.len(),
            data.block_states.len()
        );
        Ok(data)
    }

    pub fn new_item(&self, old: i32) -> i32 {
        self.items.get(&old).copied().unwrap_or(old)
    }

    /// Serverbound direction: a 1.20 item ID back to 1.19.4.
    pub fn old_item(&self, new: i32) -> i32 {
        self.items_reverse.get(&new).copied().unwrap_or(new)
    }

    pub fn new_block(&self, old: i32) -> i32 {
        self.blocks.get(&old).copied().unwrap_or(old)
    }

    pub fn new_block_state(&self, old: i32) -> i32 {
        self.block_states.get(&old).copied().unwrap_or(old)
    }
}

/// Pass a VarInt ID through, re-encoding it only if `map` changes it.
pub(crate) fn passthrough_mapped_id(
    wrapper: &mut PacketWrapper,
    map: impl Fn(i32) -> i32,
) -> TransformResult<i32> {
    let index = wrapper.written_fields();
    let id = wrapper.passthrough(VarInt)?;
    let mapped = map(id);
    if mapped != id {
        wrapper.set(VarInt, index, mapped)?;
    }
    Ok(mapped)
}
