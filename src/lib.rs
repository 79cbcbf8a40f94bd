#![forbid(unsafe_code)]
//! modcheck: smoke checks for AssemblyScript-compiled WebAssembly modules.
//!
//! The crate loads a compiled module under wasmtime, supplies the host imports it expects, and runs a
//! fixed sequence of checks that exercise the module's exports across the managed-object boundary:
//! strings, typed arrays, arithmetic and a class lifecycle.
//!
//! ## Layers
//!
//! - `loader` - Read, compile, link and instantiate (the only async and engine-aware code)
//! - `runtime` - Capability traits the checks are written against, plus an in-memory fake
//! - `exports` - Typed wrappers over the module's named exports
//! - `harness` - Checks, fail-fast runner and reporters
//! - `cli` - The `modcheck` command
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Module faults**: A trap or `abort` inside the module is an error value (`RuntimeError`), never a host
//!   panic.

pub mod cli;
pub mod exports;
pub mod harness;
pub mod loader;
pub mod runtime;
pub mod version;

pub use exports::{ArrayKind, Car, ExportSurface};
pub use harness::{HarnessConfig, HarnessError, RunSummary};
pub use loader::{ArtifactSource, ImportConfig, LoadError, WasmModule};
pub use runtime::{ManagedRuntime, Module, ModuleExports, Ref, Retained, RuntimeError};
