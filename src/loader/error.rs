//! Instantiation failures.

use std::path::PathBuf;

use thiserror::Error;

/// Why a module could not be made ready.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read artifact '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot compile module: {0}")]
    Compile(String),

    #[error("cannot instantiate module: {0}")]
    Instantiate(String),

    #[error("module does not export runtime helper `{0}`")]
    MissingRuntimeExport(&'static str),
}
