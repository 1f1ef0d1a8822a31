//! 1.19.4 packet IDs this layer rewrites.
//!
//! Clientbound IDs are the server's (1.19.4), serverbound IDs are the client's (1.20).
//! 1.20 kept the 1.19.4 play ID layout, so the two sets line up.

use burrow_protocol_core::PacketType;

// Play clientbound
pub const BLOCK_ENTITY_DATA: PacketType = PacketType::play(0x08);
pub const BLOCK_ACTION: PacketType = PacketType::play(0x09);
pub const BLOCK_UPDATE: PacketType = PacketType::play(0x0A);
pub const SET_CONTAINER_CONTENT: PacketType = PacketType::play(0x12);
pub const SET_CONTAINER_SLOT: PacketType = PacketType::play(0x14);
pub const SET_COOLDOWN: PacketType = PacketType::play(0x15);
pub const CHUNK_DATA: PacketType = PacketType::play(0x24);
pub const WORLD_EVENT: PacketType = PacketType::play(0x25);
pub const UPDATE_LIGHT: PacketType = PacketType::play(0x27);
pub const LOGIN: PacketType = PacketType::play(0x28);
pub const MERCHANT_OFFERS: PacketType = PacketType::play(0x2A);
pub const OPEN_SIGN_EDITOR: PacketType = PacketType::play(0x31);
pub const RESPAWN: PacketType = PacketType::play(0x41);
pub const UPDATE_SECTION_BLOCKS: PacketType = PacketType::play(0x43);
pub const SET_EQUIPMENT: PacketType = PacketType::play(0x55);
pub const UPDATE_RECIPES: PacketType = PacketType::play(0x6D);

// Play serverbound
pub const CLICK_CONTAINER: PacketType = PacketType::play(0x0B);
pub const SET_CREATIVE_MODE_SLOT: PacketType = PacketType::play(0x2B);
pub const UPDATE_SIGN: PacketType = PacketType::play(0x2E);
