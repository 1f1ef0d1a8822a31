//! Block entity NBT changes, currently only the 1.20 sign text layout.

use crate::packets::{BLOCK_ENTITY_DATA, CHUNK_DATA};
use burrow_nbt::{NbtValue, TAG_STRING};
use burrow_protocol_core::types::{Bool, ByteArray, Int, Nbt, Position, Short, UnsignedByte, VarInt};
use burrow_protocol_core::{
    element_count, CodecError, PacketWrapper, RegistryBuilder, TransformResult,
};
use burrow_types::TextComponent;
use tracing::trace;

pub const SIGN: i32 = 7;
pub const HANGING_SIGN: i32 = 8;

const SIGN_LINES: usize = 4;

/// Root keys that move under `front_text`, with their new names.
const FRONT_TEXT_RENAMES: [(&str, &str); 2] =
    [("Color", "color"), ("GlowingText", "has_glowing_text")];

pub fn is_sign(type_id: i32) -> bool {
    type_id == SIGN || type_id == HANGING_SIGN
}

/// Migrate a block entity tag in place. Tags of other types are left alone.
pub fn handle_block_entity(type_id: i32, tag: &mut NbtValue) -> TransformResult<()> {
    if is_sign(type_id) {
        migrate_sign_text(tag)?;
    }
    Ok(())
}

/// Build the 1.20 `front_text` compound from the 1.19.4 sign keys.
///
/// `Text1..4` stay on the root; only the styling keys are moved. A line that
/// is not a string tag fails the migration and leaves `tag` untouched.
pub fn migrate_sign_text(tag: &mut NbtValue) -> TransformResult<()> {
    let placeholder = NbtValue::String(TextComponent::empty().to_json());
    let messages = indexed_list(tag, "Text", SIGN_LINES, &placeholder)?;
    let filtered_messages = indexed_list(tag, "FilteredText", SIGN_LINES, &placeholder)?;

    let mut front_text = NbtValue::Compound(Vec::new());
    front_text.insert("messages", messages);
    front_text.insert("filtered_messages", filtered_messages);
    for (from, to) in FRONT_TEXT_RENAMES {
        relocate(tag, &mut front_text, from, to);
    }
    tag.insert("front_text", front_text);
    Ok(())
}

/// `[prefix1, prefix2, ...]` as a string list of `count` entries, with `placeholder` for missing keys.
fn indexed_list(
    tag: &NbtValue,
    prefix: &str,
    count: usize,
    placeholder: &NbtValue,
) -> TransformResult<NbtValue> {
    let lines = (1..=count)
        .map(|i| {
            tag.get(&format!("{}{}", prefix, i))
                .cloned()
                .unwrap_or_else(|| placeholder.clone())
        })
        .collect();
    Ok(NbtValue::list_of(TAG_STRING, lines).map_err(CodecError::from)?)
}

fn relocate(from: &mut NbtValue, to: &mut NbtValue, key: &str, new_key: &str) {
    if let Some(value) = from.remove(key) {
        to.insert(new_key, value);
    }
}

/// Emit a block entity's tag, migrating it when the type calls for it.
fn rewrite_tag(wrapper: &mut PacketWrapper, type_id: i32) -> TransformResult<()> {
    if !is_sign(type_id) {
        wrapper.passthrough(Nbt)?;
        return Ok(());
    }
    let mut tag = wrapper.read(Nbt)?;
    if let Some(tag) = tag.as_mut() {
        handle_block_entity(type_id, tag)?;
    }
    wrapper.write(Nbt, tag);
    Ok(())
}

pub fn register(registry: &mut RegistryBuilder) {
    registry.register_clientbound(BLOCK_ENTITY_DATA, |wrapper| {
        wrapper.passthrough(Position)?;
        let type_id = wrapper.passthrough(VarInt)?;
        rewrite_tag(wrapper, type_id)
    });

    registry.register_clientbound(CHUNK_DATA, |wrapper| {
        wrapper.passthrough(Int)?; // Chunk X
        wrapper.passthrough(Int)?; // Chunk Z
        wrapper.passthrough(Nbt)?; // Heightmaps
        wrapper.passthrough(ByteArray)?; // Sections

        let count = wrapper.passthrough(VarInt)?;
        for _ in 0..element_count(count)? {
            wrapper.passthrough(UnsignedByte)?; // Packed XZ
            wrapper.passthrough(Short)?; // Y
            let type_id = wrapper.passthrough(VarInt)?;
            rewrite_tag(wrapper, type_id)?;
        }

        let trust_edges = wrapper.read(Bool)?;
        trace!("Dropped trust edges ({}) from chunk data", trust_edges);
        Ok(())
    });
}
