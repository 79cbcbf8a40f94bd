//! Loader configuration: where the artifact comes from and what the host provides.

use std::fmt;
use std::path::PathBuf;

use super::LoadError;

/// Default artifact location, relative to the working directory.
pub const DEFAULT_ARTIFACT: &str = "build/optimized.wasm";

/// Where the compiled module comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A `.wasm` binary or `.wat` text file on disk
    Path(PathBuf),
    /// In-memory module bytes (binary or text), labelled for diagnostics
    Bytes { label: String, bytes: Vec<u8> },
}

impl Default for ArtifactSource {
    fn default() -> Self {
        ArtifactSource::Path(PathBuf::from(DEFAULT_ARTIFACT))
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Path(path) => write!(f, "{}", path.display()),
            ArtifactSource::Bytes { label, .. } => write!(f, "<{}>", label),
        }
    }
}

impl ArtifactSource {
    /// Fetch the artifact bytes.
    pub async fn read(&self) -> Result<Vec<u8>, LoadError> {
        match self {
            ArtifactSource::Path(path) => tokio::fs::read(path).await.map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            }),
            ArtifactSource::Bytes { bytes, .. } => Ok(bytes.clone()),
        }
    }
}

/// Host-provided imports, all under the `env` import module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Initial size of the imported linear memory, in 64 KiB pages
    pub initial_memory_pages: u32,
    /// Initial capacity of the imported `funcref` table
    pub initial_table_elements: u32,
    /// Link imports the host does not provide as functions that trap when called
    pub trap_unknown_imports: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            initial_memory_pages: 256,
            initial_table_elements: 256,
            trap_unknown_imports: true,
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial memory size in pages
    pub fn with_memory_pages(mut self, pages: u32) -> Self {
        self.initial_memory_pages = pages;
        self
    }

    /// Set the initial table capacity
    pub fn with_table_elements(mut self, elements: u32) -> Self {
        self.initial_table_elements = elements;
        self
    }

    /// Choose whether unknown imports link as trapping stubs
    pub fn with_trap_unknown_imports(mut self, enabled: bool) -> Self {
        self.trap_unknown_imports = enabled;
        self
    }
}
