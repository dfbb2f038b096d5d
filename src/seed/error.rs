use thiserror::Error;

/// Structural problems that stop parsing. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("line {line}: code fence is never closed")]
    UnterminatedFence { line: usize },

    #[error("line {line}: page '{page}' has no fenced metadata block")]
    MissingPageMetadata { line: usize, page: String },

    #[error("line {line}: block '{block}' has no fenced body")]
    MissingBlockFence { line: usize, block: String },
}

impl SeedError {
    pub fn line(&self) -> usize {
        match self {
            SeedError::UnterminatedFence { line }
            | SeedError::MissingPageMetadata { line, .. }
            | SeedError::MissingBlockFence { line, .. } => *line,
        }
    }
}

/// A recoverable problem; the affected field falls back to `{}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
