//! Hosts turn source text into a [`crate::unit::CompilationUnit`].
//!
//! The scanning core never sees a concrete parser; it only consumes the typed
//! tree and type table a host builds. Java via tree-sitter is the one host
//! shipped with the crate.

pub mod java;

pub use java::{parse_java, parse_java_file};

use crate::source::InvalidRange;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to load grammar: {0}")]
    Language(String),

    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at {line}:{column} near `{snippet}`")]
    Syntax {
        line: usize,
        column: usize,
        snippet: String,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Range(#[from] InvalidRange),
}
