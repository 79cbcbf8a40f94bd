//! Errors raised while talking to a loaded module.

use std::fmt;

use modcheck_abi::MemoryError;
use thiserror::Error;

use super::handle::Ref;

/// Details of an `abort` call made by the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortInfo {
    pub message: Option<String>,
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for AbortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message.as_deref().unwrap_or("(no message)"))?;
        if let Some(file) = &self.file {
            write!(f, " at {}:{}:{}", file, self.line, self.column)?;
        }
        Ok(())
    }
}

/// Error raised by a marshalling helper or an export call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("module has no export named `{0}`")]
    MissingExport(String),

    #[error("export `{name}` has an unexpected signature: {detail}")]
    Signature { name: String, detail: String },

    #[error("call to `{export}` trapped: {message}")]
    Trap { export: String, message: String },

    #[error("module aborted in `{export}`: {info}")]
    Aborted { export: String, info: AbortInfo },

    #[error("runtime type id {0} is not in the module's type table")]
    InvalidTypeId(u32),

    #[error("runtime type id {0} is not an array type")]
    NotAnArray(u32),

    #[error("runtime type id {0} does not hold 32-bit integer elements")]
    UnsupportedElement(u32),

    #[error("reference {0} does not point at a live object")]
    DanglingReference(Ref),

    #[error("reference {0} is released more often than it was retained")]
    NotRetained(Ref),

    #[error("{0} element(s) do not fit in module memory")]
    TooLarge(usize),

    #[error("memory access failed: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type for module interaction.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
