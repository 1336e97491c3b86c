use std::slice;

use crate::gc::Address;

pub const fn ptr_width() -> i32 {
    std::mem::size_of::<usize>() as i32
}

pub const fn ptr_width_usize() -> usize {
    std::mem::size_of::<usize>()
}

/// Reinterprets `count` pointer-sized elements starting at `buffer` as a
/// slice of object addresses. This is the only place that is allowed to read
/// a delivered scan buffer: reading past `count` elements is undefined, and
/// the buffer is only valid while the runtime's callback is on the stack.
pub unsafe fn ptr_slice<'a>(buffer: *const Address, count: usize) -> &'a [Address] {
    if buffer.is_null() || count == 0 {
        return &[];
    }

    slice::from_raw_parts(buffer, count)
}
