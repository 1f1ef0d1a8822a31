//! Wire type descriptors.
//!
//! Each descriptor is a unit struct naming one field encoding. Transforms pass a
//! descriptor to [`PacketWrapper`](crate::PacketWrapper) to say how the next field
//! is laid out, e.g. `wrapper.passthrough(VarInt)?`.

use crate::codec::*;
use burrow_nbt::NbtValue;
use burrow_types::{BlockPos, ItemStack};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A wire encoding with a decoded representation.
pub trait FieldType: Copy {
    type Value;

    /// Name used in diagnostics and to check `set` calls against the original write.
    fn name(&self) -> &'static str;

    fn read(&self, buf: &mut Bytes) -> CodecResult<Self::Value>;

    fn write(&self, buf: &mut BytesMut, value: &Self::Value);
}

macro_rules! fixed_width {
    ($name:ident, $value:ty, $size:expr, $get:ident, $put:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl FieldType for $name {
            type Value = $value;

            fn name(&self) -> &'static str {
                stringify!($name)
            }

            fn read(&self, buf: &mut Bytes) -> CodecResult<$value> {
                ensure_remaining(buf, $size)?;
                Ok(buf.$get())
            }

            fn write(&self, buf: &mut BytesMut, value: &$value) {
                buf.$put(*value);
            }
        }
    };
}

fixed_width!(Byte, i8, 1, get_i8, put_i8);
fixed_width!(UnsignedByte, u8, 1, get_u8, put_u8);
fixed_width!(Short, i16, 2, get_i16, put_i16);
fixed_width!(Int, i32, 4, get_i32, put_i32);
fixed_width!(Long, i64, 8, get_i64, put_i64);
fixed_width!(Float, f32, 4, get_f32, put_f32);
fixed_width!(Double, f64, 8, get_f64, put_f64);

#[derive(Debug, Clone, Copy)]
pub struct Bool;

impl FieldType for Bool {
    type Value = bool;

    fn name(&self) -> &'static str {
        "Bool"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<bool> {
        ensure_remaining(buf, 1)?;
        Ok(buf.get_u8() != 0)
    }

    fn write(&self, buf: &mut BytesMut, value: &bool) {
        buf.put_u8(*value as u8);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VarInt;

impl FieldType for VarInt {
    type Value = i32;

    fn name(&self) -> &'static str {
        "VarInt"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<i32> {
        read_varint(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &i32) {
        write_varint(buf, *value);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VarLong;

impl FieldType for VarLong {
    type Value = i64;

    fn name(&self) -> &'static str {
        "VarLong"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<i64> {
        read_varlong(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &i64) {
        write_varlong(buf, *value);
    }
}

/// VarInt-prefixed UTF-8 string of at most [`MAX_STRING_LEN`] characters.
#[derive(Debug, Clone, Copy)]
pub struct Str;

impl FieldType for Str {
    type Value = String;

    fn name(&self) -> &'static str {
        "Str"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<String> {
        read_string(buf, MAX_STRING_LEN)
    }

    fn write(&self, buf: &mut BytesMut, value: &String) {
        write_string(buf, value);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ByteArray;

impl FieldType for ByteArray {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "ByteArray"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<Vec<u8>> {
        read_byte_array(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &Vec<u8>) {
        write_byte_array(buf, value);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Position;

impl FieldType for Position {
    type Value = BlockPos;

    fn name(&self) -> &'static str {
        "Position"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<BlockPos> {
        read_position(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &BlockPos) {
        buf.put_u64(value.encode());
    }
}

/// Optional named-root compound; a bare `TAG_END` byte means absent.
#[derive(Debug, Clone, Copy)]
pub struct Nbt;

impl FieldType for Nbt {
    type Value = Option<NbtValue>;

    fn name(&self) -> &'static str {
        "Nbt"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<Option<NbtValue>> {
        read_nbt(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &Option<NbtValue>) {
        write_nbt(buf, value);
    }
}

/// A single slot: present flag, VarInt item ID, count, optional NBT.
#[derive(Debug, Clone, Copy)]
pub struct FlatItem;

impl FieldType for FlatItem {
    type Value = Option<ItemStack>;

    fn name(&self) -> &'static str {
        "FlatItem"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<Option<ItemStack>> {
        read_item(buf)
    }

    fn write(&self, buf: &mut BytesMut, value: &Option<ItemStack>) {
        write_item(buf, value);
    }
}

/// VarInt-prefixed slot list. Recipe ingredients and container contents use it.
#[derive(Debug, Clone, Copy)]
pub struct FlatItemArray;

impl FieldType for FlatItemArray {
    type Value = Vec<Option<ItemStack>>;

    fn name(&self) -> &'static str {
        "FlatItemArray"
    }

    fn read(&self, buf: &mut Bytes) -> CodecResult<Vec<Option<ItemStack>>> {
        let len = element_count(read_varint(buf)?)?;
        let mut items = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            items.push(read_item(buf)?);
        }
        Ok(items)
    }

    fn write(&self, buf: &mut BytesMut, value: &Vec<Option<ItemStack>>) {
        write_varint(buf, value.len() as i32);
        for item in value {
            write_item(buf, item);
        }
    }
}
