use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the local filesystem layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} in {}: {message}", path.display())]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("cannot encode {} as {format}: {message}", path.display())]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// Settings file whose extension names no known format
    #[error("no settings format for extension `{extension}`")]
    UnsupportedFormat { extension: String },

    #[error("cannot move {} to {}: destination exists", from.display(), to.display())]
    DestinationExists { from: PathBuf, to: PathBuf },

    #[error("could not lock {}", path.display())]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
