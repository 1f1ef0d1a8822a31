use crate::block_entity;
use crate::blocks::BlockRewriter;
use crate::items::ItemRewriter;
use crate::mappings::MappingData;
use crate::packets::*;
use crate::recipes::{RecipeRewriter, UnknownRecipePolicy};
use burrow_protocol_core::types::{Bool, Position, VarInt};
use burrow_protocol_core::{RegistryBuilder, VersionTranslator};
use burrow_types::ProtocolVersion;
use std::sync::Arc;
use tracing::debug;

/// Lets 1.20 clients join a 1.19.4 server.
pub struct V1_19_4To1_20 {
    items: ItemRewriter,
    blocks: BlockRewriter,
    recipes: Arc<RecipeRewriter>,
}

impl V1_19_4To1_20 {
    pub fn new(mappings: MappingData, unknown_recipes: UnknownRecipePolicy) -> Self {
        let mappings = Arc::new(mappings);
        let items = ItemRewriter::new(mappings.clone());
        Self {
            blocks: BlockRewriter::new(mappings),
            recipes: Arc::new(RecipeRewriter::new(items.clone(), unknown_recipes)),
            items,
        }
    }
}

impl VersionTranslator for V1_19_4To1_20 {
    fn client_version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_20
    }

    fn server_version(&self) -> ProtocolVersion {
        ProtocolVersion::V1_19_4
    }

    fn register_packets(&self, registry: &mut RegistryBuilder) {
        self.items.register(registry);
        self.blocks.register(registry);
        block_entity::register(registry);
        register_signs(registry);
        register_world(registry);

        let recipes = self.recipes.clone();
        registry.register_clientbound(UPDATE_RECIPES, move |wrapper| {
            recipes.handle_declare_recipes(wrapper)
        });
    }
}

fn register_signs(registry: &mut RegistryBuilder) {
    registry.register_clientbound(OPEN_SIGN_EDITOR, |wrapper| {
        wrapper.passthrough(Position)?;
        wrapper.write(Bool, true); // Front text
        Ok(())
    });

    // 1.19.4 signs have no back side, so edits to it cannot be sent on.
    registry.register_serverbound(UPDATE_SIGN, |wrapper| {
        let position = wrapper.passthrough(Position)?;
        let front_text = wrapper.read(Bool)?;
        if !front_text {
            debug!("Dropping back text edit for sign at {:?}", position);
            wrapper.cancel();
        }
        Ok(())
    });
}

fn register_world(registry: &mut RegistryBuilder) {
    registry.register_clientbound(UPDATE_LIGHT, |wrapper| {
        wrapper.passthrough(VarInt)?; // Chunk X
        wrapper.passthrough(VarInt)?; // Chunk Z
        wrapper.read(Bool)?; // Trust edges
        Ok(())
    });

    for packet in [LOGIN, RESPAWN] {
        registry.register_clientbound(packet, |wrapper| {
            wrapper.passthrough_all();
            wrapper.write(VarInt, 0); // Portal cooldown
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_protocol_core::{
        build_registry, write_string, write_varint, BaseTranslator, Direction, Dispatched,
        PacketRegistry, PacketType,
    };
    use burrow_types::BlockPos;
    use bytes::{BufMut, Bytes, BytesMut};

    fn registry() -> PacketRegistry {
        let layer = V1_19_4To1_20::new(MappingData::identity(), UnknownRecipePolicy::Reject);
        let base = BaseTranslator::for_layer(&layer);
        build_registry(&[&base, &layer])
    }

    fn dispatch(direction: Direction, packet: PacketType, raw: Bytes) -> Dispatched {
        registry().dispatch(direction, packet, raw).unwrap()
    }

    fn position() -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u64(BlockPos::new(-1, 80, 12).encode());
        buf
    }

    fn update_sign(front_text: bool) -> Bytes {
        let mut buf = position();
        buf.put_u8(front_text as u8);
        for line in ["one", "two", "", ""] {
            write_string(&mut buf, line);
        }
        buf.freeze()
    }

    #[test]
    fn test_open_sign_editor_gains_front_text_flag() {
        let mut expected = position();
        expected.put_u8(1);
        assert_eq!(
            dispatch(Direction::Clientbound, OPEN_SIGN_EDITOR, position().freeze()),
            Dispatched::Forward(expected)
        );
    }

    #[test]
    fn test_update_sign_front_text_is_forwarded_without_flag() {
        let mut expected = position();
        for line in ["one", "two", "", ""] {
            write_string(&mut expected, line);
        }
        assert_eq!(
            dispatch(Direction::Serverbound, UPDATE_SIGN, update_sign(true)),
            Dispatched::Forward(expected)
        );
    }

    #[test]
    fn test_update_sign_back_text_is_cancelled() {
        assert_eq!(
            dispatch(Direction::Serverbound, UPDATE_SIGN, update_sign(false)),
            Dispatched::Cancelled
        );
    }

    #[test]
    fn test_login_and_respawn_gain_portal_cooldown() {
        let body = Bytes::from_static(&[0, 0, 0, 42, 1, 2, 3]);
        let mut expected = BytesMut::from(&body[..]);
        expected.put_u8(0);
        for packet in [LOGIN, RESPAWN] {
            assert_eq!(
                dispatch(Direction::Clientbound, packet, body.clone()),
                Dispatched::Forward(expected.clone())
            );
        }
    }

    #[test]
    fn test_update_light_drops_trust_edges() {
        let mut raw = BytesMut::new();
        write_varint(&mut raw, 4);
        write_varint(&mut raw, -2);
        raw.put_u8(1);
        raw.put_slice(&[1, 7, 0, 0]);

        let mut expected = BytesMut::new();
        write_varint(&mut expected, 4);
        write_varint(&mut expected, -2);
        expected.put_slice(&[1, 7, 0, 0]);

        assert_eq!(
            dispatch(Direction::Clientbound, UPDATE_LIGHT, raw.freeze()),
            Dispatched::Forward(expected)
        );
    }

    #[test]
    fn test_handshake_goes_through_base_layer() {
        let mut raw = BytesMut::new();
        write_varint(&mut raw, 763);
        write_string(&mut raw, "mc.example.net");
        raw.put_u16(25565);
        write_varint(&mut raw, 2);

        let mut expected = BytesMut::new();
        write_varint(&mut expected, 762);
        write_string(&mut expected, "mc.example.net");
        expected.put_u16(25565);
        write_varint(&mut expected, 2);

        assert_eq!(
            dispatch(
                Direction::Serverbound,
                burrow_protocol_core::base::HANDSHAKE,
                raw.freeze()
            ),
            Dispatched::Forward(expected)
        );
    }

    #[test]
    fn test_unhandled_play_packet_is_untouched() {
        let raw = Bytes::from_static(&[9, 8, 7]);
        assert_eq!(
            dispatch(Direction::Clientbound, PacketType::play(0x23), raw.clone()),
            Dispatched::Forward(BytesMut::from(&raw[..]))
        );
    }
}
