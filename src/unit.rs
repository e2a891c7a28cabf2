use crate::source::SourceFile;
use crate::tree::SyntaxTree;
use crate::types::TypeTable;
use std::path::{Path, PathBuf};

/// One parsed source file as supplied by a host: text, typed tree and the
/// type universe visible from it.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub path: Option<PathBuf>,
    pub source: SourceFile,
    pub tree: SyntaxTree,
    pub types: TypeTable,
}

impl CompilationUnit {
    pub fn new(source: SourceFile, tree: SyntaxTree, types: TypeTable) -> Self {
        Self {
            path: None,
            source,
            tree,
            types,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        self.source.text()
    }

    /// Path for display, `<memory>` for units that were not read from disk.
    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}
