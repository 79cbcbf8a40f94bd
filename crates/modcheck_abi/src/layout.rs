//! Object header and array view offsets.
//!
//! Every managed object is preceded by four little-endian `u32` header words:
//!
//! ```text
//! ref - 16  mmInfo   (allocator block info)
//! ref - 12  gcInfo   (reference count and collector state)
//! ref -  8  rtId     (runtime type id)
//! ref -  4  rtSize   (payload size in bytes)
//! ref       payload
//! ```

/// Size of the header preceding every managed object.
pub const HEADER_SIZE: u32 = 16;
/// Byte offset of the allocator info word, relative to the reference.
pub const MM_INFO_OFFSET: i32 = -16;
/// Byte offset of the collector info word, relative to the reference.
pub const GC_INFO_OFFSET: i32 = -12;
/// Byte offset of the runtime type id, relative to the reference.
pub const ID_OFFSET: i32 = -8;
/// Byte offset of the payload size, relative to the reference.
pub const SIZE_OFFSET: i32 = -4;

/// `ArrayBufferView.buffer`: retained reference to the backing `ArrayBuffer`.
pub const VIEW_BUFFER_OFFSET: u32 = 0;
/// `ArrayBufferView.dataStart`: address of the first element.
pub const VIEW_DATASTART_OFFSET: u32 = 4;
/// `ArrayBufferView.byteLength`: length of the viewed region in bytes.
pub const VIEW_BYTELENGTH_OFFSET: u32 = 8;
/// Payload size of a typed array view.
pub const VIEW_SIZE: u32 = 12;
/// `Array<T>.length_`: element count of a growable array.
pub const ARRAY_LENGTH_OFFSET: u32 = 12;
/// Payload size of a growable array.
pub const ARRAY_SIZE: u32 = 16;

/// Error raised when an access falls outside linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryError {
    pub addr: u64,
    pub len: u64,
    pub memory_size: u64,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "access of {} byte(s) at {:#x} is outside linear memory ({} bytes)",
            self.len, self.addr, self.memory_size
        )
    }
}

impl std::error::Error for MemoryError {}

/// Compute `base + offset` as an address, rejecting wrap-around.
pub fn offset_addr(base: u32, offset: i32) -> Result<u32, MemoryError> {
    base.checked_add_signed(offset).ok_or(MemoryError {
        addr: u64::from(base),
        len: offset.unsigned_abs().into(),
        memory_size: 0,
    })
}

/// Address of the payload field `offset` bytes into the object at `ptr`.
pub fn field_addr(ptr: u32, offset: u32) -> Result<u32, MemoryError> {
    ptr.checked_add(offset).ok_or(MemoryError {
        addr: u64::from(ptr) + u64::from(offset),
        len: 4,
        memory_size: 0,
    })
}

/// Borrow `len` bytes at `addr`.
pub fn slice(memory: &[u8], addr: u32, len: u32) -> Result<&[u8], MemoryError> {
    let start = addr as usize;
    let end = start.checked_add(len as usize);
    match end {
        Some(end) if end <= memory.len() => Ok(&memory[start..end]),
        _ => Err(MemoryError {
            addr: u64::from(addr),
            len: u64::from(len),
            memory_size: memory.len() as u64,
        }),
    }
}

/// Mutably borrow `len` bytes at `addr`.
pub fn slice_mut(memory: &mut [u8], addr: u32, len: u32) -> Result<&mut [u8], MemoryError> {
    let memory_size = memory.len() as u64;
    let start = addr as usize;
    match start.checked_add(len as usize) {
        Some(end) if end <= memory.len() => Ok(&mut memory[start..end]),
        _ => Err(MemoryError {
            addr: u64::from(addr),
            len: u64::from(len),
            memory_size,
        }),
    }
}

/// Read a little-endian `u32` at `addr`.
pub fn read_u32(memory: &[u8], addr: u32) -> Result<u32, MemoryError> {
    let bytes = slice(memory, addr, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Write a little-endian `u32` at `addr`.
pub fn write_u32(memory: &mut [u8], addr: u32, value: u32) -> Result<(), MemoryError> {
    slice_mut(memory, addr, 4)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Read the runtime type id of the object at `ptr`.
pub fn object_id(memory: &[u8], ptr: u32) -> Result<u32, MemoryError> {
    read_u32(memory, offset_addr(ptr, ID_OFFSET)?)
}

/// Read the payload size of the object at `ptr`.
pub fn object_size(memory: &[u8], ptr: u32) -> Result<u32, MemoryError> {
    read_u32(memory, offset_addr(ptr, SIZE_OFFSET)?)
}
