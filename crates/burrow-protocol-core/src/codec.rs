use burrow_nbt::{NbtError, NbtValue, TAG_END};
use burrow_types::{BlockPos, ItemStack};
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Default upper bound for protocol strings, in characters.
pub const MAX_STRING_LEN: usize = 32767;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Not enough data")]
    NotEnoughData,
    #[error("String too long: {0} > {1}")]
    StringTooLong(usize, usize),
    #[error("Negative length: {0}")]
    NegativeLength(i32),
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Fail with `NotEnoughData` unless `needed` bytes remain.
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> CodecResult<()> {
    if buf.remaining() < needed {
        return Err(CodecError::NotEnoughData);
    }
    Ok(())
}

/// Convert a decoded length or element count, rejecting negatives.
pub fn element_count(value: i32) -> CodecResult<usize> {
    usize::try_from(value).map_err(|_| CodecError::NegativeLength(value))
}

/// Read a VarInt from the buffer.
pub fn read_varint<B: Buf>(buf: &mut B) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 32 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarInt to the buffer.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read a VarLong from the buffer.
pub fn read_varlong<B: Buf>(buf: &mut B) -> CodecResult<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarLong to the buffer.
pub fn write_varlong(buf: &mut BytesMut, mut value: i64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Calculate the byte length of a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    len
}

/// Read a protocol string (varint-prefixed UTF-8).
pub fn read_string<B: Buf>(buf: &mut B, max_len: usize) -> CodecResult<String> {
    let len = element_count(read_varint(buf)?)?;
    if len > max_len * 4 {
        return Err(CodecError::StringTooLong(len, max_len));
    }
    ensure_remaining(buf, len)?;
    let bytes = buf.copy_to_bytes(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Write a protocol string.
pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

/// Read a byte array with varint length prefix.
pub fn read_byte_array<B: Buf>(buf: &mut B) -> CodecResult<Vec<u8>> {
    let len = element_count(read_varint(buf)?)?;
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len).to_vec())
}

/// Write a byte array with varint length prefix.
pub fn write_byte_array(buf: &mut BytesMut, data: &[u8]) {
    write_varint(buf, data.len() as i32);
    buf.put_slice(data);
}

/// Read a packed block position.
pub fn read_position<B: Buf>(buf: &mut B) -> CodecResult<BlockPos> {
    ensure_remaining(buf, 8)?;
    Ok(BlockPos::decode(buf.get_u64()))
}

/// Read an optional named-root NBT tag. The root name is not kept.
/// Running out of input inside the tag is `NotEnoughData`, like any other short read.
pub fn read_nbt<B: Buf>(buf: &mut B) -> CodecResult<Option<NbtValue>> {
    match NbtValue::read_root_named(buf) {
        Ok(tag) => Ok(tag.map(|(_, value)| value)),
        Err(NbtError::NotEnoughData) => Err(CodecError::NotEnoughData),
        Err(e) => Err(e.into()),
    }
}

/// Write an optional NBT tag as an unnamed root, or `TAG_END` when absent.
pub fn write_nbt(buf: &mut BytesMut, nbt: &Option<NbtValue>) {
    match nbt {
        Some(value) => value.write_root_named("", buf),
        None => buf.put_u8(TAG_END),
    }
}

/// Read a Slot from the wire (flat VarInt format, 1.13.2 to 1.20.4).
/// Returns None for empty slots.
pub fn read_item<B: Buf>(buf: &mut B) -> CodecResult<Option<ItemStack>> {
    ensure_remaining(buf, 1)?;
    if buf.get_u8() == 0 {
        return Ok(None);
    }
    let item_id = read_varint(buf)?;
    ensure_remaining(buf, 1)?;
    let count = buf.get_i8();
    let nbt = read_nbt(buf)?;
    Ok(Some(ItemStack {
        item_id,
        count,
        nbt,
    }))
}

/// Write a Slot to the wire (flat VarInt format).
pub fn write_item(buf: &mut BytesMut, slot: &Option<ItemStack>) {
    match slot {
        None => buf.put_u8(0),
        Some(item) => {
            buf.put_u8(1);
            write_varint(buf, item.item_id);
            buf.put_i8(item.count);
            write_nbt(buf, &item.nbt);
        }
    }
}
