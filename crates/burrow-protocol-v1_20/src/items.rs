use crate::mappings::{passthrough_mapped_id, MappingData};
use crate::packets::*;
use burrow_protocol_core::types::{
    Bool, Byte, FlatItem, FlatItemArray, Float, Int, Short, UnsignedByte, VarInt,
};
use burrow_protocol_core::{
    element_count, Direction, PacketWrapper, RegistryBuilder, TransformResult,
};
use burrow_types::ItemStack;
use std::sync::Arc;

/// Rewrites item IDs inside slots.
#[derive(Clone)]
pub struct ItemRewriter {
    mappings: Arc<MappingData>,
}

impl ItemRewriter {
    pub fn new(mappings: Arc<MappingData>) -> Self {
        Self { mappings }
    }

    pub fn map_id(&self, id: i32, direction: Direction) -> i32 {
        match direction {
            Direction::Clientbound => self.mappings.new_item(id),
            Direction::Serverbound => self.mappings.old_item(id),
        }
    }

    /// Returns whether the stack changed.
    fn rewrite(&self, item: &mut Option<ItemStack>, direction: Direction) -> bool {
        let Some(stack) = item else {
            return false;
        };
        let mapped = self.map_id(stack.item_id, direction);
        if mapped == stack.item_id {
            return false;
        }
        stack.item_id = mapped;
        true
    }

    pub fn passthrough_item(
        &self,
        wrapper: &mut PacketWrapper,
        direction: Direction,
    ) -> TransformResult<()> {
        let index = wrapper.written_fields();
        let mut item = wrapper.passthrough(FlatItem)?;
        if self.rewrite(&mut item, direction) {
            wrapper.set(FlatItem, index, item)?;
        }
        Ok(())
    }

    /// A VarInt-counted slot list: container contents and recipe ingredients.
    pub fn passthrough_items(
        &self,
        wrapper: &mut PacketWrapper,
        direction: Direction,
    ) -> TransformResult<()> {
        let index = wrapper.written_fields();
        let mut items = wrapper.passthrough(FlatItemArray)?;
        let mut changed = false;
        for item in items.iter_mut() {
            changed |= self.rewrite(item, direction);
        }
        if changed {
            wrapper.set(FlatItemArray, index, items)?;
        }
        Ok(())
    }

    pub fn passthrough_ingredient(&self, wrapper: &mut PacketWrapper) -> TransformResult<()> {
        self.passthrough_items(wrapper, Direction::Clientbound)
    }

    pub fn register(&self, registry: &mut RegistryBuilder) {
        let items = self.clone();
        registry.register_clientbound(SET_CONTAINER_SLOT, move |wrapper| {
            wrapper.passthrough(UnsignedByte)?; // Window ID
            wrapper.passthrough(VarInt)?; // State ID
            wrapper.passthrough(Short)?; // Slot
            items.passthrough_item(wrapper, Direction::Clientbound)
        });

        let items = self.clone();
        registry.register_clientbound(SET_CONTAINER_CONTENT, move |wrapper| {
            wrapper.passthrough(UnsignedByte)?; // Window ID
            wrapper.passthrough(VarInt)?; // State ID
            items.passthrough_items(wrapper, Direction::Clientbound)?;
            items.passthrough_item(wrapper, Direction::Clientbound) // Carried item
        });

        let items = self.clone();
        registry.register_clientbound(SET_COOLDOWN, move |wrapper| {
            passthrough_mapped_id(wrapper, |id| items.map_id(id, Direction::Clientbound))?;
            wrapper.passthrough(VarInt)?; // Ticks
            Ok(())
        });

        let items = self.clone();
        registry.register_clientbound(SET_EQUIPMENT, move |wrapper| {
            wrapper.passthrough(VarInt)?; // Entity ID
            loop {
                let slot = wrapper.passthrough(Byte)?;
                items.passthrough_item(wrapper, Direction::Clientbound)?;
                // top bit set means another entry follows
                if slot as u8 & 0x80 == 0 {
                    return Ok(());
                }
            }
        });

        let items = self.clone();
        registry.register_clientbound(MERCHANT_OFFERS, move |wrapper| {
            wrapper.passthrough(VarInt)?; // Window ID
            let count = wrapper.passthrough(VarInt)?;
            for _ in 0..element_count(count)? {
                items.passthrough_item(wrapper, Direction::Clientbound)?; // Input 1
                items.passthrough_item(wrapper, Direction::Clientbound)?; // Output
                items.passthrough_item(wrapper, Direction::Clientbound)?; // Input 2
                wrapper.passthrough(Bool)?; // Disabled
                wrapper.passthrough(Int)?; // Uses
                wrapper.passthrough(Int)?; // Max uses
                wrapper.passthrough(Int)?; // XP
                wrapper.passthrough(Int)?; // Special price
                wrapper.passthrough(Float)?; // Price multiplier
                wrapper.passthrough(Int)?; // Demand
            }
            Ok(())
        });

        let items = self.clone();
        registry.register_serverbound(SET_CREATIVE_MODE_SLOT, move |wrapper| {
            wrapper.passthrough(Short)?; // Slot
            items.passthrough_item(wrapper, Direction::Serverbound)
        });

        let items = self.clone();
        registry.register_serverbound(CLICK_CONTAINER, move |wrapper| {
            wrapper.passthrough(UnsignedByte)?; // Window ID
            wrapper.passthrough(VarInt)?; // State ID
            wrapper.passthrough(Short)?; // Slot
            wrapper.passthrough(Byte)?; // Button
            wrapper.passthrough(VarInt)?; // Mode
            let changed = wrapper.passthrough(VarInt)?;
            for _ in 0..element_count(changed)? {
                wrapper.passthrough(Short)?; // Slot
                items.passthrough_item(wrapper, Direction::Serverbound)?;
            }
            items.passthrough_item(wrapper, Direction::Serverbound) // Carried item
        });
    }
}
