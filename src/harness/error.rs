//! Harness error types.

use miette::Diagnostic;
use thiserror::Error;

use super::assert::AssertionFailure;
use crate::loader::LoadError;
use crate::runtime::RuntimeError;

/// Why a single check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("assertion failed: {0}")]
    Assertion(#[from] AssertionFailure),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Fatal harness outcome. The run stops at the first one.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("could not instantiate the module")]
    #[diagnostic(
        code(modcheck::load),
        help("build the module with its runtime exported (`--exportRuntime`) and check the artifact path")
    )]
    Load(#[from] LoadError),

    #[error("check `{name}` failed")]
    #[diagnostic(code(modcheck::check))]
    Check {
        name: &'static str,
        #[source]
        source: CheckError,
    },
}
