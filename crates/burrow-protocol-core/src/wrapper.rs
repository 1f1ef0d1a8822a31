use crate::error::{PreconditionViolation, TransformResult};
use crate::types::FieldType;
use bytes::{Bytes, BytesMut};

/// Outcome of running a packet through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Payload to send on, without the packet ID.
    Forward(BytesMut),
    /// The packet must be dropped.
    Cancelled,
}

/// One field already committed for re-emission.
#[derive(Debug)]
struct EmittedField {
    type_name: &'static str,
    bytes: Bytes,
}

/// Sequential cursor over a single packet's payload.
///
/// Reads consume the source strictly front to back. Writes append encoded fields to an
/// output list that `set` can patch by index afterwards. Whatever a transform leaves
/// unread is appended after the emitted fields when the packet is finished.
pub struct PacketWrapper {
    source: Bytes,
    fields: Vec<EmittedField>,
    cancelled: bool,
}

impl PacketWrapper {
    pub fn new(source: Bytes) -> Self {
        Self {
            source,
            fields: Vec::new(),
            cancelled: false,
        }
    }

    /// Decode the next field without emitting it.
    pub fn read<T: FieldType>(&mut self, ty: T) -> TransformResult<T::Value> {
        Ok(ty.read(&mut self.source)?)
    }

    /// Append a field to the output.
    pub fn write<T: FieldType>(&mut self, ty: T, value: T::Value) {
        let mut buf = BytesMut::new();
        ty.write(&mut buf, &value);
        self.fields.push(EmittedField {
            type_name: ty.name(),
            bytes: buf.freeze(),
        });
    }

    /// Decode the next field and emit the exact bytes it was read from.
    pub fn passthrough<T: FieldType>(&mut self, ty: T) -> TransformResult<T::Value> {
        let start = self.source.clone();
        let value = ty.read(&mut self.source)?;
        let consumed = start.len() - self.source.len();
        self.fields.push(EmittedField {
            type_name: ty.name(),
            bytes: start.slice(..consumed),
        });
        Ok(value)
    }

    /// Re-encode the field emitted at `index` (zero-based, in emission order).
    pub fn set<T: FieldType>(&mut self, ty: T, index: usize, value: T::Value) -> TransformResult<()> {
        let written = self.fields.len();
        let field = self
            .fields
            .get_mut(index)
            .ok_or(PreconditionViolation::FieldNotWritten { index, written })?;
        if field.type_name != ty.name() {
            return Err(PreconditionViolation::FieldTypeMismatch {
                index,
                expected: field.type_name,
                actual: ty.name(),
            }
            .into());
        }
        let mut buf = BytesMut::new();
        ty.write(&mut buf, &value);
        field.bytes = buf.freeze();
        Ok(())
    }

    /// Emit everything not read yet as a single field.
    pub fn passthrough_all(&mut self) {
        let rest = std::mem::take(&mut self.source);
        self.fields.push(EmittedField {
            type_name: "Remaining",
            bytes: rest,
        });
    }

    /// Discard everything not read yet.
    pub fn clear_input(&mut self) {
        self.source.clear();
    }

    /// Drop this packet. Output written before or after is discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of fields emitted so far; the index the next write will get.
    pub fn written_fields(&self) -> usize {
        self.fields.len()
    }

    /// Unread source bytes.
    pub fn remaining(&self) -> usize {
        self.source.len()
    }

    /// Serialize the emitted fields followed by any unread input.
    pub fn finish(self) -> Dispatched {
        if self.cancelled {
            return Dispatched::Cancelled;
        }
        let len = self.fields.iter().map(|f| f.bytes.len()).sum::<usize>() + self.source.len();
        let mut out = BytesMut::with_capacity(len);
        for field in &self.fields {
            out.extend_from_slice(&field.bytes);
        }
        out.extend_from_slice(&self.source);
        Dispatched::Forward(out)
    }
}
