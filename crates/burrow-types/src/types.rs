use burrow_nbt::NbtValue;
use serde::Serialize;

/// A block position in the world (x, y, z integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Encode as a 64-bit long (protocol format since 1.14).
    /// x: 26 bits, z: 26 bits, y: 12 bits
    pub fn encode(&self) -> u64 {
        ((self.x as u64 & 0x3FFFFFF) << 38)
            | ((self.z as u64 & 0x3FFFFFF) << 12)
            | (self.y as u64 & 0xFFF)
    }

    pub fn decode(val: u64) -> Self {
        let mut x = (val >> 38) as i32;
        let mut z = ((val >> 12) & 0x3FFFFFF) as i32;
        let mut y = (val & 0xFFF) as i32;
        if x >= 1 << 25 {
            x -= 1 << 26;
        }
        if z >= 1 << 25 {
            z -= 1 << 26;
        }
        if y >= 1 << 11 {
            y -= 1 << 12;
        }
        Self { x, y, z }
    }
}

/// Drop an explicit `minecraft:` prefix from a resource key, leaving other namespaces untouched.
/// Registry lookups use the bare path for vanilla keys.
pub fn strip_minecraft_namespace(key: &str) -> &str {
    key.strip_prefix("minecraft:").unwrap_or(key)
}

/// A protocol revision, as sent in the handshake and the status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub id: i32,
    pub name: &'static str,
}

impl ProtocolVersion {
    pub const V1_19_4: ProtocolVersion = ProtocolVersion {
        id: 762,
        name: "1.19.4",
    };
    pub const V1_20: ProtocolVersion = ProtocolVersion {
        id: 763,
        name: "1.20",
    };
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A plain-text chat component.
#[derive(Debug, Clone, Serialize)]
pub struct TextComponent {
    pub text: String,
}

impl TextComponent {
    /// `{"text":""}`, what the client renders as an empty line.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"text":""}"#.to_string())
    }
}

/// An item stack in an inventory slot (flat VarInt-id format, 1.13.2 to 1.20.4).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    /// Item registry ID in the protocol version the stack was read from.
    pub item_id: i32,
    /// Number of items in this stack (1-127).
    pub count: i8,
    /// Custom data (enchantments, display name, ...).
    pub nbt: Option<NbtValue>,
}

impl ItemStack {
    pub fn new(item_id: i32, count: i8) -> Self {
        Self {
            item_id,
            count,
            nbt: None,
        }
    }

    pub fn with_nbt(mut self, nbt: NbtValue) -> Self {
        self.nbt = Some(nbt);
        self
    }
}
