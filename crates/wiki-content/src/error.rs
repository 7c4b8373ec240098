//! Error types for wiki-content

/// Result type for wiki-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wiki-content operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid frontmatter: {message}")]
    Frontmatter { message: String },

    #[error("Unterminated frontmatter block")]
    UnterminatedFrontmatter,

    #[error("Malformed conflict markers at line {line}: {message}")]
    MalformedMarkers { line: usize, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn frontmatter(message: impl Into<String>) -> Self {
        Self::Frontmatter {
            message: message.into(),
        }
    }
}
