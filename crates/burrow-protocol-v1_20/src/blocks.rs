use crate::mappings::{passthrough_mapped_id, MappingData};
use crate::packets::{BLOCK_ACTION, BLOCK_UPDATE, UPDATE_SECTION_BLOCKS, WORLD_EVENT};
use burrow_protocol_core::types::{Bool, Int, Long, Position, UnsignedByte, VarInt, VarLong};
use burrow_protocol_core::{element_count, RegistryBuilder};
use std::sync::Arc;

/// World event whose data is the item ID of the record being played.
pub const RECORD_PLAY: i32 = 1010;
/// World event whose data is the block state being broken.
pub const BLOCK_BREAK: i32 = 2001;

/// Entries in Update Section Blocks pack the block state above a 12-bit local position.
const SECTION_POS_BITS: u32 = 12;

/// Rewrites block and block-state IDs in block packets.
#[derive(Clone)]
pub struct BlockRewriter {
    mappings: Arc<MappingData>,
}

impl BlockRewriter {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self { mappings }
    }

    pub fn register(&self, registry: &mut RegistryBuilder) {
        let mappings = self.mappings.clone();
        registry.register_clientbound(BLOCK_UPDATE, move |wrapper| {
            wrapper.passthrough(Position)?;
            passthrough_mapped_id(wrapper, |id| mappings.new_block_state(id))?;
            Ok(())
        });

        let mappings = self.mappings.clone();
        registry.register_clientbound(BLOCK_ACTION, move |wrapper| {
            wrapper.passthrough(Position)?;
            wrapper.passthrough(UnsignedByte)?; // Action ID
            wrapper.passthrough(UnsignedByte)?; // Action parameter
            passthrough_mapped_id(wrapper, |id| mappings.new_block(id))?;
            Ok(())
        });

        let mappings = self.mappings.clone();
        registry.register_clientbound(UPDATE_SECTION_BLOCKS, move |wrapper| {
            wrapper.passthrough(Long)?; // Section position
            wrapper.passthrough(Bool)?; // Suppress light updates
            let count = wrapper.passthrough(VarInt)?;
            for _ in 0..element_count(count)? {
                let index = wrapper.written_fields();
                let entry = wrapper.passthrough(VarLong)?;
                let state = (entry >> SECTION_POS_BITS) as i32;
                let mapped = mappings.new_block_state(state);
                if mapped != state {
                    let local = entry & ((1 << SECTION_POS_BITS) - 1);
                    wrapper.set(VarLong, index, ((mapped as i64) << SECTION_POS_BITS) | local)?;
                }
            }
            Ok(())
        });

        let mappings = self.mappings.clone();
        registry.register_clientbound(WORLD_EVENT, move |wrapper| {
            let event = wrapper.passthrough(Int)?;
            wrapper.passthrough(Position)?;
            let index = wrapper.written_fields();
            let data = wrapper.passthrough(Int)?;
            let mapped = match event {
                RECORD_PLAY => mappings.new_item(data),
                BLOCK_BREAK => mappings.new_block_state(data),
                _ => data,
            };
            if mapped != data {
                wrapper.set(Int, index, mapped)?;
            }
            Ok(())
        });
    }
}
