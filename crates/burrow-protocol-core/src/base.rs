//! Handshake and status handling shared by every version pair.

use crate::codec::{ensure_remaining, read_string, read_varint, CodecResult};
use crate::registry::RegistryBuilder;
use crate::state::{ConnectionState, PacketType};
use crate::translator::VersionTranslator;
use crate::types::{Str, VarInt};
use burrow_types::ProtocolVersion;
use bytes::{Buf, Bytes};
use serde_json::Value;
use tracing::debug;

pub const HANDSHAKE: PacketType = PacketType::new(ConnectionState::Handshaking, 0x00);
pub const STATUS_RESPONSE: PacketType = PacketType::new(ConnectionState::Status, 0x00);
pub const ENCRYPTION_REQUEST: PacketType = PacketType::new(ConnectionState::Login, 0x01);
pub const LOGIN_SUCCESS: PacketType = PacketType::new(ConnectionState::Login, 0x02);
pub const SET_COMPRESSION: PacketType = PacketType::new(ConnectionState::Login, 0x03);

/// The first packet a client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

impl Handshake {
    pub fn decode(mut data: Bytes) -> CodecResult<Self> {
        let protocol_version = read_varint(&mut data)?;
        let server_address = read_string(&mut data, 255)?;
        ensure_remaining(&data, 2)?;
        let server_port = data.get_u16();
        let next_state = read_varint(&mut data)?;
        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}

/// Rewrites the version the client announces and the version the server advertises.
pub struct BaseTranslator {
    client: ProtocolVersion,
    server: ProtocolVersion,
}

impl BaseTranslator {
    pub fn new(client: ProtocolVersion, server: ProtocolVersion) -> Self {
        Self { client, server }
    }

    /// Base layer for the same version pair as `layer`.
    pub fn for_layer(layer: &dyn VersionTranslator) -> Self {
        Self::new(layer.client_version(), layer.server_version())
    }
}

impl VersionTranslator for BaseTranslator {
    fn client_version(&self) -> ProtocolVersion {
        self.client
    }

    fn server_version(&self) -> ProtocolVersion {
        self.server
    }

    fn register_packets(&self, registry: &mut RegistryBuilder) {
        let (client, server) = (self.client, self.server);

        registry.register_serverbound(HANDSHAKE, move |wrapper| {
            let announced = wrapper.read(VarInt)?;
            if announced != client.id {
                debug!(
                    "Client announced protocol {}, translating as {}",
                    announced, client
                );
            }
            wrapper.write(VarInt, server.id);
            Ok(())
        });

        registry.register_clientbound(STATUS_RESPONSE, move |wrapper| {
            let json = wrapper.read(Str)?;
            let rewritten = rewrite_status_version(&json, server, client)?;
            wrapper.write(Str, rewritten.unwrap_or(json));
            Ok(())
        });
    }
}

/// Swap `version` in a status response from `server` to `client`.
/// Returns `None` when the server advertises some other version.
pub fn rewrite_status_version(
    json: &str,
    server: ProtocolVersion,
    client: ProtocolVersion,
) -> CodecResult<Option<String>> {
    let mut status: Value = serde_json::from_str(json)?;
    let Some(version) = status.get_mut("version") else {
        return Ok(None);
    };
    if version.get("protocol").and_then(Value::as_i64) != Some(server.id as i64) {
        return Ok(None);
    }
    version["protocol"] = Value::from(client.id);
    version["name"] = Value::from(client.name);
    Ok(Some(serde_json::to_string(&status)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{write_string, write_varint, CodecError};
    use crate::error::TransformError;
    use crate::state::Direction;
    use crate::translator::build_registry;
    use crate::wrapper::Dispatched;
    use bytes::{BufMut, BytesMut};

    fn handshake_bytes(protocol: i32) -> Bytes {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, protocol);
        write_string(&mut buf, "localhost");
        buf.put_u16(25565);
        write_varint(&mut buf, 2);
        buf.freeze()
    }

    fn registry() -> crate::PacketRegistry {
        let base = BaseTranslator::new(ProtocolVersion::V1_20, ProtocolVersion::V1_19_4);
        build_registry(&[&base])
    }

    #[test]
    fn test_handshake_decode() {
        let handshake = Handshake::decode(handshake_bytes(763)).unwrap();
        assert_eq!(
            handshake,
            Handshake {
                protocol_version: 763,
                server_address: "localhost".into(),
                server_port: 25565,
                next_state: 2,
            }
        );
        assert!(matches!(
            Handshake::decode(handshake_bytes(763).slice(..4)),
            Err(CodecError::NotEnoughData)
        ));
    }

    #[test]
    fn test_handshake_version_is_rewritten() {
        let result = registry()
            .dispatch(Direction::Serverbound, HANDSHAKE, handshake_bytes(763))
            .unwrap();
        let Dispatched::Forward(out) = result else {
            panic!("handshake cancelled");
        };
        let handshake = Handshake::decode(out.freeze()).unwrap();
        assert_eq!(handshake.protocol_version, 762);
        assert_eq!(handshake.server_address, "localhost");
        assert_eq!(handshake.next_state, 2);
    }

    #[test]
    fn test_status_version_is_rewritten() {
        let json = r#"{"version":{"name":"1.19.4","protocol":762},"players":{"max":20,"online":0}}"#;
        let rewritten =
            rewrite_status_version(json, ProtocolVersion::V1_19_4, ProtocolVersion::V1_20)
                .unwrap()
                .unwrap();
        let value: Value = serde_json::from_str(&rewritten).unwrap();
        assert_eq!(value["version"]["protocol"], 763);
        assert_eq!(value["version"]["name"], "1.20");
        assert_eq!(value["players"]["max"], 20);
    }

    #[test]
    fn test_status_for_other_version_is_left_alone() {
        let json = r#"{"version":{"name":"1.18.2","protocol":758}}"#;
        assert!(
            rewrite_status_version(json, ProtocolVersion::V1_19_4, ProtocolVersion::V1_20)
                .unwrap()
                .is_none()
        );

        let mut payload = BytesMut::new();
        write_string(&mut payload, json);
        let result = registry()
            .dispatch(Direction::Clientbound, STATUS_RESPONSE, payload.clone().freeze())
            .unwrap();
        assert_eq!(result, Dispatched::Forward(payload));
    }

    #[test]
    fn test_invalid_status_json_is_an_error() {
        let mut payload = BytesMut::new();
        write_string(&mut payload, "{not json");
        let err = registry()
            .dispatch(Direction::Clientbound, STATUS_RESPONSE, payload.freeze())
            .unwrap_err();
        assert!(matches!(err, TransformError::Decode(CodecError::Json(_))));
    }
}
