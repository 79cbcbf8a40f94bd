//! Module loading.
//!
//! ## Modules
//!
//! - `config` - Artifact source and host import settings
//! - `host` - The `env` import object (memory, table, `abort`, `trace`)
//! - `wasm` - The wasmtime-backed [`WasmModule`]
//!
//! ## Flow
//!
//! Read bytes → compile (off the async thread) → link host imports → instantiate → resolve the
//! runtime helpers. Any failure is a [`LoadError`]; no check runs against a half-loaded module.

pub mod config;
pub mod error;
pub mod host;
pub mod wasm;

pub use config::{ArtifactSource, DEFAULT_ARTIFACT, ImportConfig};
pub use error::LoadError;
pub use wasm::WasmModule;

use wasmtime::{Engine, Module};

/// Read, compile and instantiate the module at `source`.
///
/// Text-format (`.wat`) input is accepted as well as binary.
#[tracing::instrument(skip_all, fields(artifact = %source))]
pub async fn load(source: &ArtifactSource, config: &ImportConfig) -> Result<WasmModule, LoadError> {
    let bytes = source.read().await?;
    tracing::debug!(bytes = bytes.len(), "artifact read");

    let engine = Engine::default();
    let compile_engine = engine.clone();
    let module = tokio::task::spawn_blocking(move || Module::new(&compile_engine, &bytes))
        .await
        .map_err(|e| LoadError::Compile(format!("compilation task failed: {e}")))?
        .map_err(|e| LoadError::Compile(format!("{e:#}")))?;
    tracing::debug!(imports = module.imports().len(), exports = module.exports().len(), "module compiled");

    WasmModule::instantiate(&engine, &module, config)
}
