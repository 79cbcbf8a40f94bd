//! Describe the managed-object layout of AssemblyScript-compiled WebAssembly modules.
//!
//! This crate is intentionally small and dependency-free. It holds the numbers and pure codecs that
//! both the wasm adapter and the in-memory fake module agree on:
//! - where the runtime header words sit relative to a managed reference,
//! - how runtime type-info flags encode array kinds and element layouts,
//! - how strings are encoded in module memory.
//!
//! ## Notes
//!
//! - **No IO**, no global state, no engine types. Memory is always passed in as a byte slice.
//! - The layout matches the AssemblyScript 0.9 incremental runtime (`--runtime full`).

pub mod layout;
pub mod rtti;
pub mod strings;

pub use layout::{MemoryError, read_u32, write_u32};
pub use rtti::{TypeFlags, TypeInfo};
pub use strings::{decode_utf16, encode_utf16};

/// Runtime id of `ArrayBuffer`, the backing store of every array view.
pub const ARRAYBUFFER_ID: u32 = 0;
/// Runtime id of `String`.
pub const STRING_ID: u32 = 1;
/// Runtime id of the abstract `ArrayBufferView` base class.
pub const ARRAYBUFFERVIEW_ID: u32 = 2;
