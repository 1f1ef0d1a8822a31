use crate::codec::element_count;
use crate::error::TransformResult;
use crate::types::VarInt;
use crate::wrapper::PacketWrapper;

/// What an element callback did with the element it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    /// The element was re-emitted.
    Keep,
    /// The element was consumed without emitting anything.
    Drop,
}

/// Walk a VarInt-counted sequence, letting `element` keep or drop each entry, then
/// patch the count so it matches what was emitted.
///
/// `element` must either emit the whole element or none of it.
/// Returns the number of elements kept.
pub fn resize_collection<F>(wrapper: &mut PacketWrapper, mut element: F) -> TransformResult<i32>
where
    F: FnMut(&mut PacketWrapper) -> TransformResult<Retain>,
{
    let count_index = wrapper.written_fields();
    let size = wrapper.passthrough(VarInt)?;
    let mut kept = size;
    for _ in 0..element_count(size)? {
        if element(wrapper)? == Retain::Drop {
            kept -= 1;
        }
    }
    if kept != size {
        wrapper.set(VarInt, count_index, kept)?;
    }
    Ok(kept)
}
