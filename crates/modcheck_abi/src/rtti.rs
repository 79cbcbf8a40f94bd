//! Runtime type information.
//!
//! A module exports `__rtti_base`, the address of a table laid out as:
//!
//! ```text
//! count: u32
//! entries[count]: { flags: u32, base: u32 }
//! ```
//!
//! `base` is the runtime id of the superclass, or `0` for none.

use crate::layout::{MemoryError, field_addr, read_u32};

/// Size of one type-info entry.
pub const ENTRY_SIZE: u32 = 8;

/// Bit offset of the value alignment field.
pub const VAL_ALIGN_OFFSET: u32 = 5;

/// Type-info flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeFlags(pub u32);

impl TypeFlags {
    pub const NONE: TypeFlags = TypeFlags(0);
    pub const ARRAYBUFFERVIEW: TypeFlags = TypeFlags(1 << 0);
    pub const ARRAY: TypeFlags = TypeFlags(1 << 1);
    pub const SET: TypeFlags = TypeFlags(1 << 2);
    pub const MAP: TypeFlags = TypeFlags(1 << 3);
    pub const VAL_ALIGN_0: TypeFlags = TypeFlags(1 << 5);
    pub const VAL_ALIGN_1: TypeFlags = TypeFlags(1 << 6);
    pub const VAL_ALIGN_2: TypeFlags = TypeFlags(1 << 7);
    pub const VAL_ALIGN_3: TypeFlags = TypeFlags(1 << 8);
    pub const VAL_ALIGN_4: TypeFlags = TypeFlags(1 << 9);
    pub const VAL_SIGNED: TypeFlags = TypeFlags(1 << 10);
    pub const VAL_FLOAT: TypeFlags = TypeFlags(1 << 11);
    pub const VAL_NULLABLE: TypeFlags = TypeFlags(1 << 12);
    pub const VAL_MANAGED: TypeFlags = TypeFlags(1 << 13);

    /// Check whether every bit of `other` is set.
    pub fn contains(self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Log2 of the element size, taken from the highest set alignment bit.
    ///
    /// ## Returns
    /// - (`Option<u32>`): `None` when no alignment bit is set (not a collection type).
    pub fn value_align(self) -> Option<u32> {
        let bits = (self.0 >> VAL_ALIGN_OFFSET) & 0b1_1111;
        if bits == 0 { None } else { Some(31 - bits.leading_zeros()) }
    }

    /// Check whether values are plain 32-bit integers (not floats, not references).
    pub fn is_i32_elements(self) -> bool {
        self.value_align() == Some(2) && !self.contains(Self::VAL_FLOAT) && !self.contains(Self::VAL_MANAGED)
    }
}

impl std::ops::BitOr for TypeFlags {
    type Output = TypeFlags;

    fn bitor(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | rhs.0)
    }
}

/// One decoded type-info entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub id: u32,
    pub flags: TypeFlags,
    pub base: u32,
}

impl TypeInfo {
    /// Check whether instances are array views (typed arrays or `Array<T>`).
    pub fn is_array_view(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAYBUFFERVIEW)
    }

    /// Check whether instances are growable `Array<T>` with an explicit length field.
    pub fn is_array(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAY)
    }
}

/// Number of entries in the table at `rtti_base`.
pub fn type_count(memory: &[u8], rtti_base: u32) -> Result<u32, MemoryError> {
    read_u32(memory, rtti_base)
}

/// Look up the entry for `id`.
///
/// ## Returns
/// - (`Ok(None)`): `id` is not below the table's entry count.
pub fn lookup(memory: &[u8], rtti_base: u32, id: u32) -> Result<Option<TypeInfo>, MemoryError> {
    if id >= type_count(memory, rtti_base)? {
        return Ok(None);
    }
    let entry = entry_addr(memory, rtti_base, id)?;
    Ok(Some(TypeInfo {
        id,
        flags: TypeFlags(read_u32(memory, entry)?),
        base: read_u32(memory, field_addr(entry, 4)?)?,
    }))
}

/// Address of the entry for `id`; a table too large for the address space is a memory error.
fn entry_addr(memory: &[u8], rtti_base: u32, id: u32) -> Result<u32, MemoryError> {
    id.checked_mul(ENTRY_SIZE)
        .and_then(|offset| offset.checked_add(4))
        .and_then(|offset| rtti_base.checked_add(offset))
        .ok_or(MemoryError {
            addr: u64::from(rtti_base) + 4 + u64::from(id) * u64::from(ENTRY_SIZE),
            len: u64::from(ENTRY_SIZE),
            memory_size: memory.len() as u64,
        })
}

/// Walk the base chain of `id` looking for `base_id`.
///
/// The chain ends at base `0` or at an id outside the table. Cycles are cut after `count` steps.
pub fn is_subtype(memory: &[u8], rtti_base: u32, id: u32, base_id: u32) -> Result<bool, MemoryError> {
    let count = type_count(memory, rtti_base)?;
    let mut current = id;
    for _ in 0..=count {
        if current == base_id {
            return Ok(true);
        }
        match lookup(memory, rtti_base, current)? {
            Some(info) if info.base != 0 => current = info.base,
            _ => return Ok(false),
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::write_u32;

    /// Build a table with entries `(flags, base)` at address 0.
    fn table(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut memory = vec![0u8; 4 + entries.len() * 8];
        write_u32(&mut memory, 0, entries.len() as u32).unwrap();
        for (i, (flags, base)) in entries.iter().enumerate() {
            let at = 4 + i as u32 * 8;
            write_u32(&mut memory, at, *flags).unwrap();
            write_u32(&mut memory, at + 4, *base).unwrap();
        }
        memory
    }

    #[test]
    fn test_value_align_uses_highest_bit() {
        assert_eq!(TypeFlags::VAL_ALIGN_0.value_align(), Some(0));
        assert_eq!(TypeFlags::VAL_ALIGN_2.value_align(), Some(2));
        assert_eq!(TypeFlags::VAL_ALIGN_3.value_align(), Some(3));
        assert_eq!(TypeFlags::ARRAY.value_align(), None);
    }

    #[test]
    fn test_i32_elements() {
        let int32 = TypeFlags::ARRAYBUFFERVIEW | TypeFlags::VAL_ALIGN_2 | TypeFlags::VAL_SIGNED;
        let float32 = TypeFlags::ARRAYBUFFERVIEW | TypeFlags::VAL_ALIGN_2 | TypeFlags::VAL_FLOAT;
        assert!(int32.is_i32_elements());
        assert!(!float32.is_i32_elements());
    }

    #[test]
    fn test_lookup_out_of_range_is_none() {
        let memory = table(&[(0, 0), (0, 0)]);
        assert!(lookup(&memory, 0, 1).unwrap().is_some());
        assert_eq!(lookup(&memory, 0, 2).unwrap(), None);
    }

    #[test]
    fn test_subtype_walks_base_chain() {
        // 0: ArrayBuffer, 1: String, 2: ArrayBufferView, 3: Int32Array extends ArrayBufferView
        let memory = table(&[(0, 0), (0, 0), (0, 0), (TypeFlags::ARRAYBUFFERVIEW.0, 2)]);
        assert!(is_subtype(&memory, 0, 3, 3).unwrap());
        assert!(is_subtype(&memory, 0, 3, 2).unwrap());
        assert!(!is_subtype(&memory, 0, 3, 1).unwrap());
        assert!(!is_subtype(&memory, 0, 9, 3).unwrap());
    }

    #[test]
    fn test_corrupt_count_is_an_error_not_a_panic() {
        let mut memory = vec![0u8; 64];
        write_u32(&mut memory, 0, u32::MAX).unwrap();

        let err = lookup(&memory, 0, 0x2000_0000).unwrap_err();
        assert_eq!(err.addr, 4 + 0x2000_0000 * 8);
        // Fits the address space but not the memory.
        assert!(lookup(&memory, 0, 0x1fff_ffff).is_err());
        write_u32(&mut memory, 8, u32::MAX).unwrap();
        assert!(lookup(&memory, 8, 0x1fff_ffff).is_err());
        assert!(lookup(&memory, 0, 1_000).is_err());
        assert!(is_subtype(&memory, 0, u32::MAX - 1, 3).is_err());
    }

    #[test]
    fn test_subtype_cycle_terminates() {
        let memory = table(&[(0, 0), (0, 2), (0, 1)]);
        assert!(!is_subtype(&memory, 0, 1, 0).unwrap());
    }
}
