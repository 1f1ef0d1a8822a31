use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// NBT tag type IDs.
pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

/// Same nesting limit the vanilla client enforces.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("Not enough data")]
    NotEnoughData,
    #[error("Invalid tag type: {0}")]
    InvalidTagType(u8),
    #[error("Negative length: {0}")]
    NegativeLength(i32),
    #[error("Nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("List of tag type {expected} holds a tag of type {found}")]
    MixedList { expected: u8, found: u8 },
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type NbtResult<T> = Result<T, NbtError>;

/// An NBT value.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtValue>),
    Compound(Vec<(String, NbtValue)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtValue {
    pub fn tag_id(&self) -> u8 {
        match self {
            NbtValue::Byte(_) => TAG_BYTE,
            NbtValue::Short(_) => TAG_SHORT,
            NbtValue::Int(_) => TAG_INT,
            NbtValue::Long(_) => TAG_LONG,
            NbtValue::Float(_) => TAG_FLOAT,
            NbtValue::Double(_) => TAG_DOUBLE,
            NbtValue::ByteArray(_) => TAG_BYTE_ARRAY,
            NbtValue::String(_) => TAG_STRING,
            NbtValue::List(_) => TAG_LIST,
            NbtValue::Compound(_) => TAG_COMPOUND,
            NbtValue::IntArray(_) => TAG_INT_ARRAY,
            NbtValue::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Look up a direct child of a compound. Always `None` for other tag types.
    pub fn get(&self, key: &str) -> Option<&NbtValue> {
        match self {
            NbtValue::Compound(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Insert into a compound, replacing an existing entry in place so key order is stable.
    /// Does nothing on non-compound values.
    pub fn insert(&mut self, key: impl Into<String>, value: NbtValue) {
        if let NbtValue::Compound(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(name, _)| *name == key) {
                Some((_, existing)) => *existing = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Remove a direct child of a compound, returning it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<NbtValue> {
        match self {
            NbtValue::Compound(entries) => {
                let index = entries.iter().position(|(name, _)| name == key)?;
                Some(entries.remove(index).1)
            }
            _ => None,
        }
    }

    /// Build a list whose elements must all be of type `element_id`.
    pub fn list_of(element_id: u8, items: Vec<NbtValue>) -> NbtResult<NbtValue> {
        if let Some(item) = items.iter().find(|item| item.tag_id() != element_id) {
            return Err(NbtError::MixedList {
                expected: element_id,
                found: item.tag_id(),
            });
        }
        Ok(NbtValue::List(items))
    }

    /// Write this value as a full named root tag (files and pre-1.20.2 network NBT).
    pub fn write_root_named(&self, name: &str, buf: &mut BytesMut) {
        buf.put_u8(self.tag_id());
        write_nbt_string(name, buf);
        self.write_payload(buf);
    }

    /// Write just the payload (no tag type or name).
    pub fn write_payload(&self, buf: &mut BytesMut) {
        match self {
            NbtValue::Byte(v) => buf.put_i8(*v),
            NbtValue::Short(v) => buf.put_i16(*v),
            NbtValue::Int(v) => buf.put_i32(*v),
            NbtValue::Long(v) => buf.put_i64(*v),
            NbtValue::Float(v) => buf.put_f32(*v),
            NbtValue::Double(v) => buf.put_f64(*v),
            NbtValue::ByteArray(v) => {
                buf.put_i32(v.len() as i32);
                for b in v {
                    buf.put_i8(*b);
                }
            }
            NbtValue::String(v) => {
                write_nbt_string(v, buf);
            }
            NbtValue::List(v) => {
                if v.is_empty() {
                    buf.put_u8(TAG_END);
                    buf.put_i32(0);
                } else {
                    buf.put_u8(v[0].tag_id());
                    buf.put_i32(v.len() as i32);
                    for item in v {
                        item.write_payload(buf);
                    }
                }
            }
            NbtValue::Compound(entries) => {
                for (name, value) in entries {
                    buf.put_u8(value.tag_id());
                    write_nbt_string(name, buf);
                    value.write_payload(buf);
                }
                buf.put_u8(TAG_END);
            }
            NbtValue::IntArray(v) => {
                buf.put_i32(v.len() as i32);
                for i in v {
                    buf.put_i32(*i);
                }
            }
            NbtValue::LongArray(v) => {
                buf.put_i32(v.len() as i32);
                for l in v {
                    buf.put_i64(*l);
                }
            }
        }
    }

    /// Read a named root tag as sent on the wire before 1.20.2.
    /// A leading `TAG_END` byte means "no tag" and yields `None`.
    pub fn read_root_named<B: Buf>(buf: &mut B) -> NbtResult<Option<(String, NbtValue)>> {
        ensure(buf, 1)?;
        let tag_id = buf.get_u8();
        if tag_id == TAG_END {
            return Ok(None);
        }
        let name = read_nbt_string(buf)?;
        let value = Self::read_payload(tag_id, buf, 0)?;
        Ok(Some((name, value)))
    }

    /// Read the payload of a tag whose type byte has already been consumed.
    pub fn read_payload<B: Buf>(tag_id: u8, buf: &mut B, depth: usize) -> NbtResult<NbtValue> {
        if depth > MAX_DEPTH {
            return Err(NbtError::TooDeep(MAX_DEPTH));
        }
        let value = match tag_id {
            TAG_BYTE => {
                ensure(buf, 1)?;
                NbtValue::Byte(buf.get_i8())
            }
            TAG_SHORT => {
                ensure(buf, 2)?;
                NbtValue::Short(buf.get_i16())
            }
            TAG_INT => {
                ensure(buf, 4)?;
                NbtValue::Int(buf.get_i32())
            }
            TAG_LONG => {
                ensure(buf, 8)?;
                NbtValue::Long(buf.get_i64())
            }
            TAG_FLOAT => {
                ensure(buf, 4)?;
                NbtValue::Float(buf.get_f32())
            }
            TAG_DOUBLE => {
                ensure(buf, 8)?;
                NbtValue::Double(buf.get_f64())
            }
            TAG_BYTE_ARRAY => {
                let len = read_length(buf, 1)?;
                NbtValue::ByteArray((0..len).map(|_| buf.get_i8()).collect())
            }
            TAG_STRING => NbtValue::String(read_nbt_string(buf)?),
            TAG_LIST => {
                ensure(buf, 1)?;
                let element_id = buf.get_u8();
                ensure(buf, 4)?;
                let len = buf.get_i32();
                if len < 0 {
                    return Err(NbtError::NegativeLength(len));
                }
                if element_id == TAG_END && len > 0 {
                    return Err(NbtError::InvalidTagType(TAG_END));
                }
                let mut items = Vec::with_capacity((len as usize).min(buf.remaining()));
                for _ in 0..len {
                    items.push(Self::read_payload(element_id, buf, depth + 1)?);
                }
                NbtValue::List(items)
            }
            TAG_COMPOUND => {
                let mut entries = Vec::new();
                loop {
                    ensure(buf, 1)?;
                    let child_id = buf.get_u8();
                    if child_id == TAG_END {
                        break;
                    }
                    let name = read_nbt_string(buf)?;
                    let value = Self::read_payload(child_id, buf, depth + 1)?;
                    entries.push((name, value));
                }
                NbtValue::Compound(entries)
            }
            TAG_INT_ARRAY => {
                let len = read_length(buf, 4)?;
                NbtValue::IntArray((0..len).map(|_| buf.get_i32()).collect())
            }
            TAG_LONG_ARRAY => {
                let len = read_length(buf, 8)?;
                NbtValue::LongArray((0..len).map(|_| buf.get_i64()).collect())
            }
            other => return Err(NbtError::InvalidTagType(other)),
        };
        Ok(value)
    }
}

fn ensure<B: Buf>(buf: &B, needed: usize) -> NbtResult<()> {
    if buf.remaining() < needed {
        return Err(NbtError::NotEnoughData);
    }
    Ok(())
}

/// Read an i32 array length and check that `len * element_size` bytes are available.
fn read_length<B: Buf>(buf: &mut B, element_size: usize) -> NbtResult<usize> {
    ensure(buf, 4)?;
    let len = buf.get_i32();
    if len < 0 {
        return Err(NbtError::NegativeLength(len));
    }
    let len = len as usize;
    ensure(buf, len.saturating_mul(element_size))?;
    Ok(len)
}

fn read_nbt_string<B: Buf>(buf: &mut B) -> NbtResult<String> {
    ensure(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure(buf, len)?;
    let bytes = buf.copy_to_bytes(len);
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn write_nbt_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
}

/// Helper macro for building compound tags.
#[macro_export]
macro_rules! nbt_compound {
    ($($key:expr => $val:expr),* $(,)?) => {
        $crate::NbtValue::Compound(vec![
            $(($key.into(), $val)),*
        ])
    };
}

/// Helper macro for building list tags.
#[macro_export]
macro_rules! nbt_list {
    ($($val:expr),* $(,)?) => {
        $crate::NbtValue::List(vec![$($val),*])
    };
}
