use crate::codec::{read_varint, varint_len, write_varint, CodecError};
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

/// Largest frame the protocol allows (a three byte VarInt length).
pub const MAX_FRAME_LEN: usize = 2_097_151;

/// A length-prefixed packet stream with optional zlib compression.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    compression_threshold: Option<i32>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            compression_threshold: None,
        }
    }

    /// Connect to `addr` and wrap the stream.
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// `None` disables compression.
    pub fn set_compression(&mut self, threshold: Option<i32>) {
        self.compression_threshold = threshold;
    }

    /// Read a single packet frame, returning (packet_id, payload).
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        read_frame(&mut self.stream, &mut self.read_buf, self.compression_threshold).await
    }

    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload, self.compression_threshold)?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }

    /// Split into read and write halves for concurrent I/O.
    /// Buffered input and compression state carry over.
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        let (read_half, write_half) = self.stream.into_split();
        (
            ConnectionReader {
                stream: read_half,
                read_buf: self.read_buf,
                compression_threshold: self.compression_threshold,
            },
            ConnectionWriter {
                stream: write_half,
                compression_threshold: self.compression_threshold,
            },
        )
    }
}

/// Read half of a split connection.
pub struct ConnectionReader {
    stream: OwnedReadHalf,
    read_buf: BytesMut,
    compression_threshold: Option<i32>,
}

impl ConnectionReader {
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        read_frame(&mut self.stream, &mut self.read_buf, self.compression_threshold).await
    }

    /// Applies to frames not parsed yet, including ones already buffered.
    pub fn set_compression(&mut self, threshold: Option<i32>) {
        self.compression_threshold = threshold;
    }
}

/// Write half of a split connection.
pub struct ConnectionWriter {
    stream: OwnedWriteHalf,
    compression_threshold: Option<i32>,
}

impl ConnectionWriter {
    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload, self.compression_threshold)?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    pub fn set_compression(&mut self, threshold: Option<i32>) {
        self.compression_threshold = threshold;
    }
}

// === Shared helpers ===

async fn read_frame<R: tokio::io::AsyncRead + Unpin>(
    stream: &mut R,
    read_buf: &mut BytesMut,
    compression_threshold: Option<i32>,
) -> anyhow::Result<(i32, BytesMut)> {
    loop {
        if let Some(result) = try_parse_packet(read_buf, compression_threshold)? {
            return Ok(result);
        }
        let n = stream.read_buf(read_buf).await?;
        if n == 0 {
            return Err(anyhow::anyhow!("Connection closed"));
        }
    }
}

fn try_parse_packet(
    read_buf: &mut BytesMut,
    compression_threshold: Option<i32>,
) -> anyhow::Result<Option<(i32, BytesMut)>> {
    if read_buf.is_empty() {
        return Ok(None);
    }

    let mut peek = &read_buf[..];
    let length = match read_varint(&mut peek) {
        Ok(len) => len,
        Err(CodecError::NotEnoughData) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if length < 0 || length as usize > MAX_FRAME_LEN {
        anyhow::bail!("Invalid frame length {}", length);
    }
    let length = length as usize;
    let varint_bytes = read_buf.len() - peek.len();

    if peek.remaining() < length {
        return Ok(None);
    }

    read_buf.advance(varint_bytes);
    let mut packet_data = read_buf.split_to(length);

    if compression_threshold.is_some() {
        let data_length = read_varint(&mut packet_data)?;
        if data_length < 0 || data_length as usize > MAX_FRAME_LEN * 4 {
            anyhow::bail!("Invalid uncompressed length {}", data_length);
        }
        if data_length > 0 {
            let mut decompressed = vec![0u8; data_length as usize];
            let mut decoder = ZlibDecoder::new(&packet_data[..]);
            decoder.read_exact(&mut decompressed)?;
            packet_data = BytesMut::from(&decompressed[..]);
        }
    }

    let packet_id = read_varint(&mut packet_data)?;
    trace!(
        "Read packet id=0x{:02X} len={}",
        packet_id,
        packet_data.len()
    );

    Ok(Some((packet_id, packet_data)))
}

fn build_frame(
    packet_id: i32,
    payload: &[u8],
    compression_threshold: Option<i32>,
) -> std::io::Result<BytesMut> {
    let mut packet_buf = BytesMut::new();
    write_varint(&mut packet_buf, packet_id);
    packet_buf.extend_from_slice(payload);

    let mut frame = BytesMut::new();

    if let Some(threshold) = compression_threshold {
        let uncompressed_len = packet_buf.len() as i32;
        if threshold >= 0 && uncompressed_len >= threshold {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&packet_buf)?;
            let compressed = encoder.finish()?;

            let data_length_size = varint_len(uncompressed_len);
            let total_length = data_length_size + compressed.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, uncompressed_len);
            frame.extend_from_slice(&compressed);
        } else {
            let total_length = 1 + packet_buf.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, 0);
            frame.extend_from_slice(&packet_buf);
        }
    } else {
        write_varint(&mut frame, packet_buf.len() as i32);
        frame.extend_from_slice(&packet_buf);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_uncompressed_frame_layout() {
        let frame = build_frame(0x2E, &[1, 2, 3], None).unwrap();
        assert_eq!(frame.to_vec(), vec![4, 0x2E, 1, 2, 3]);

        let mut buf = frame;
        let (id, payload) = try_parse_packet(&mut buf, None).unwrap().unwrap();
        assert_eq!(id, 0x2E);
        assert_eq!(payload.to_vec(), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_compressed_frames() {
        let small = build_frame(0x01, &[9; 4], Some(256)).unwrap();
        // below threshold: data length 0 then the raw packet
        assert_eq!(small[1], 0);

        let payload = vec![7u8; 1024];
        let large = build_frame(0x24, &payload, Some(256)).unwrap();
        assert!(large.len() < payload.len());

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&small);
        buf.extend_from_slice(&large);
        let (id, data) = try_parse_packet(&mut buf, Some(256)).unwrap().unwrap();
        assert_eq!((id, data.to_vec()), (0x01, vec![9; 4]));
        let (id, data) = try_parse_packet(&mut buf, Some(256)).unwrap().unwrap();
        assert_eq!((id, data.to_vec()), (0x24, payload));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more_data() {
        let frame = build_frame(0x10, &[0; 300], None).unwrap();
        let mut buf = BytesMut::from(&frame[..1]);
        assert!(try_parse_packet(&mut buf, None).unwrap().is_none());
        buf.extend_from_slice(&frame[1..50]);
        assert!(try_parse_packet(&mut buf, None).unwrap().is_none());
        buf.extend_from_slice(&frame[50..]);
        assert!(try_parse_packet(&mut buf, None).unwrap().is_some());
    }

    #[test]
    fn test_invalid_frame_length_is_rejected() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, -1);
        assert!(try_parse_packet(&mut buf, None).is_err());
    }

    #[tokio::test]
    async fn test_split_connection_exchanges_packets() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream);
            let (id, payload) = conn.read_packet().await.unwrap();
            conn.set_compression(Some(64));
            conn.write_packet(id + 1, &payload).await.unwrap();
        });

        let client = Connection::connect(&addr).await.unwrap();
        let (mut reader, mut writer) = client.into_split();
        writer.write_packet(0x05, &[42; 128]).await.unwrap();
        reader.set_compression(Some(64));
        let (id, payload) = reader.read_packet().await.unwrap();
        assert_eq!(id, 0x06);
        assert_eq!(payload.to_vec(), vec![42; 128]);
        server.await.unwrap();
    }
}
