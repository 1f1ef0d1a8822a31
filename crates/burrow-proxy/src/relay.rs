use anyhow::{anyhow, bail, Context, Result};
use burrow_protocol_core::base::{ENCRYPTION_REQUEST, HANDSHAKE, LOGIN_SUCCESS, SET_COMPRESSION};
use burrow_protocol_core::{
    read_varint, Connection, ConnectionReader, ConnectionState, ConnectionWriter, Direction,
    Dispatched, Handshake, PacketRegistry, PacketType, TransformError,
};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Relay one client through the registry to `backend` until either side hangs up.
pub async fn handle_connection(stream: TcpStream, backend: Arc<str>, registry: Arc<PacketRegistry>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".into());
    if let Err(e) = relay(Connection::new(stream), &backend, &registry, &peer).await {
        if is_translation_failure(&e) {
            warn!("Connection {} closed, packet could not be translated: {:#}", peer, e);
        } else {
            debug!("Connection {} ended: {:#}", peer, e);
        }
    }
}

/// A packet failed to translate, as opposed to a hangup or socket error.
fn is_translation_failure(e: &anyhow::Error) -> bool {
    e.downcast_ref::<TransformError>().is_some()
}

async fn relay(
    mut client: Connection,
    backend: &str,
    registry: &PacketRegistry,
    peer: &str,
) -> Result<()> {
    // === Handshake ===
    let (id, data) = client.read_packet().await?;
    if id != HANDSHAKE.id {
        bail!("Expected handshake, got packet 0x{:02X}", id);
    }
    let data = data.freeze();
    let handshake = Handshake::decode(data.clone())?;
    let mut state = ConnectionState::from_handshake_next(handshake.next_state)
        .ok_or_else(|| anyhow!("Invalid next state: {}", handshake.next_state))?;
    debug!(
        "Handshake from {}: protocol={}, next_state={:?}",
        peer, handshake.protocol_version, state
    );

    let mut server = Connection::connect(backend)
        .await
        .with_context(|| format!("Failed to connect to backend {}", backend))?;
    match registry.dispatch(Direction::Serverbound, HANDSHAKE, data)? {
        Dispatched::Forward(payload) => server.write_packet(id, &payload).await?,
        Dispatched::Cancelled => return Ok(()),
    }
    if state == ConnectionState::Login {
        info!("{} joining through {}", peer, backend);
    }

    let (mut client_rx, mut client_tx) = client.into_split();
    let (mut server_rx, mut server_tx) = server.into_split();

    loop {
        tokio::select! {
            packet = client_rx.read_packet() => {
                let (id, data) = packet?;
                let packet = PacketType::new(state, id);
                forward(registry, Direction::Serverbound, packet, data, &mut server_tx).await?;
            }
            packet = server_rx.read_packet() => {
                let (id, data) = packet?;
                let packet = PacketType::new(state, id);

                if packet == ENCRYPTION_REQUEST {
                    bail!("Backend {} requested encryption; it must run in offline mode", backend);
                }
                let threshold = if packet == SET_COMPRESSION {
                    Some(read_varint(&mut data.clone())?)
                } else {
                    None
                };

                forward(registry, Direction::Clientbound, packet, data, &mut client_tx).await?;

                if let Some(threshold) = threshold {
                    let threshold = (threshold >= 0).then_some(threshold);
                    debug!("Compression threshold for {} set to {:?}", peer, threshold);
                    set_compression(threshold, &mut client_rx, &mut client_tx, &mut server_rx, &mut server_tx);
                } else if packet == LOGIN_SUCCESS {
                    state = ConnectionState::Play;
                    debug!("{} entered play state", peer);
                }
            }
        }
    }
}

async fn forward(
    registry: &PacketRegistry,
    direction: Direction,
    packet: PacketType,
    data: BytesMut,
    writer: &mut ConnectionWriter,
) -> Result<()> {
    match registry.dispatch(direction, packet, data.freeze())? {
        Dispatched::Forward(payload) => writer.write_packet(packet.id, &payload).await,
        Dispatched::Cancelled => {
            debug!("Cancelled {:?} {}", direction, packet);
            Ok(())
        }
    }
}

fn set_compression(
    threshold: Option<i32>,
    client_rx: &mut ConnectionReader,
    client_tx: &mut ConnectionWriter,
    server_rx: &mut ConnectionReader,
    server_tx: &mut ConnectionWriter,
) {
    client_rx.set_compression(threshold);
    client_tx.set_compression(threshold);
    server_rx.set_compression(threshold);
    server_tx.set_compression(threshold);
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_protocol_core::{
        build_registry, write_string, write_varint, BaseTranslator, CodecError,
    };
    use burrow_protocol_v1_20::packets::{OPEN_SIGN_EDITOR, UPDATE_SIGN};
    use burrow_protocol_v1_20::{MappingData, UnknownRecipePolicy, V1_19_4To1_20};
    use burrow_types::BlockPos;
    use bytes::BufMut;
    use tokio::net::TcpListener;

    fn registry() -> Arc<PacketRegistry> {
        let layer = V1_19_4To1_20::new(MappingData::identity(), UnknownRecipePolicy::Reject);
        let base = BaseTranslator::for_layer(&layer);
        Arc::new(build_registry(&[&base, &layer]))
    }

    fn position() -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u64(BlockPos::new(5, 64, 5).encode());
        buf
    }

    fn update_sign(front_text: bool) -> BytesMut {
        let mut buf = position();
        buf.put_u8(front_text as u8);
        for line in ["front", "", "", ""] {
            write_string(&mut buf, line);
        }
        buf
    }

    #[tokio::test]
    async fn test_login_and_play_through_proxy() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr: Arc<str> = backend.local_addr().unwrap().to_string().into();
        let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = proxy.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = backend.accept().await.unwrap();
            let mut conn = Connection::new(stream);

            let (id, data) = conn.read_packet().await.unwrap();
            assert_eq!(id, HANDSHAKE.id);
            let handshake = Handshake::decode(data.freeze()).unwrap();
            assert_eq!(handshake.protocol_version, 762);

            let (id, _) = conn.read_packet().await.unwrap();
            assert_eq!(id, 0x00); // Login Start

            let mut threshold = BytesMut::new();
            write_varint(&mut threshold, 64);
            conn.write_packet(SET_COMPRESSION.id, &threshold).await.unwrap();
            conn.set_compression(Some(64));
            conn.write_packet(LOGIN_SUCCESS.id, &[0; 20]).await.unwrap();
            conn.write_packet(OPEN_SIGN_EDITOR.id, &position()).await.unwrap();

            // the back text edit never arrives
            let (id, data) = conn.read_packet().await.unwrap();
            assert_eq!(id, UPDATE_SIGN.id);
            let mut expected = position();
            for line in ["front", "", "", ""] {
                write_string(&mut expected, line);
            }
            assert_eq!(data, expected);
        });

        let registry = registry();
        tokio::spawn(async move {
            let (stream, _) = proxy.accept().await.unwrap();
            handle_connection(stream, backend_addr, registry).await;
        });

        let mut client = Connection::connect(&proxy_addr).await.unwrap();
        let mut handshake = BytesMut::new();
        write_varint(&mut handshake, 763);
        write_string(&mut handshake, "localhost");
        handshake.put_u16(25565);
        write_varint(&mut handshake, 2);
        client.write_packet(HANDSHAKE.id, &handshake).await.unwrap();
        let mut login_start = BytesMut::new();
        write_string(&mut login_start, "Steve");
        client.write_packet(0x00, &login_start).await.unwrap();

        let (id, _) = client.read_packet().await.unwrap();
        assert_eq!(id, SET_COMPRESSION.id);
        client.set_compression(Some(64));
        let (id, _) = client.read_packet().await.unwrap();
        assert_eq!(id, LOGIN_SUCCESS.id);

        let (id, data) = client.read_packet().await.unwrap();
        assert_eq!(id, OPEN_SIGN_EDITOR.id);
        let mut expected = position();
        expected.put_u8(1);
        assert_eq!(data, expected);

        client
            .write_packet(UPDATE_SIGN.id, &update_sign(false))
            .await
            .unwrap();
        client
            .write_packet(UPDATE_SIGN.id, &update_sign(true))
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_encryption_request_ends_connection() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = backend.local_addr().unwrap().to_string();
        let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = proxy.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = backend.accept().await.unwrap();
            let mut conn = Connection::new(stream);
            conn.read_packet().await.unwrap();
            conn.write_packet(ENCRYPTION_REQUEST.id, &[0; 8]).await.unwrap();
            // hold the socket open until the proxy drops it
            let _ = conn.read_packet().await;
        });

        let relayed = tokio::spawn(async move {
            let (stream, _) = proxy.accept().await.unwrap();
            relay(Connection::new(stream), &backend_addr, &registry(), "test").await
        });

        let mut client = Connection::connect(&proxy_addr).await.unwrap();
        let mut handshake = BytesMut::new();
        write_varint(&mut handshake, 763);
        write_string(&mut handshake, "localhost");
        handshake.put_u16(25565);
        write_varint(&mut handshake, 2);
        client.write_packet(HANDSHAKE.id, &handshake).await.unwrap();

        let err = relayed.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("offline mode"));
        assert!(client.read_packet().await.is_err());
    }

    #[test]
    fn test_translation_failures_are_told_apart() {
        let decode: anyhow::Error = TransformError::Decode(CodecError::NotEnoughData).into();
        assert!(is_translation_failure(&decode));
        let unmapped: anyhow::Error = TransformError::UnmappedDiscriminant {
            kind: "recipe type",
            value: "minecraft:mystery".into(),
        }
        .into();
        assert!(is_translation_failure(&unmapped.context("while relaying")));

        let hangup = anyhow::Error::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(!is_translation_failure(&hangup));
        assert!(!is_translation_failure(&anyhow!("Expected handshake, got packet 0x05")));
    }

    #[tokio::test]
    async fn test_malformed_packet_is_a_translation_failure() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = backend.local_addr().unwrap().to_string();
        let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = proxy.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = backend.accept().await.unwrap();
            let mut conn = Connection::new(stream);
            conn.read_packet().await.unwrap();
            conn.write_packet(LOGIN_SUCCESS.id, &[0; 20]).await.unwrap();
            // open sign editor with a truncated position
            conn.write_packet(OPEN_SIGN_EDITOR.id, &[0; 3]).await.unwrap();
            let _ = conn.read_packet().await;
        });

        let relayed = tokio::spawn(async move {
            let (stream, _) = proxy.accept().await.unwrap();
            relay(Connection::new(stream), &backend_addr, &registry(), "test").await
        });

        let mut client = Connection::connect(&proxy_addr).await.unwrap();
        let mut handshake = BytesMut::new();
        write_varint(&mut handshake, 763);
        write_string(&mut handshake, "localhost");
        handshake.put_u16(25565);
        write_varint(&mut handshake, 2);
        client.write_packet(HANDSHAKE.id, &handshake).await.unwrap();

        let err = relayed.await.unwrap().unwrap_err();
        assert!(is_translation_failure(&err));
    }
}
