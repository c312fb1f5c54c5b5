use std::path::PathBuf;

/// Failure to turn one piece of shared content into a [`SharedItem`].
///
/// Never fatal to an invocation: the sequencer logs it and moves on.
///
/// [`SharedItem`]: sharebridge_common::SharedItem
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shared storage root {} is unavailable: {source}", root.display())]
    DestinationUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("access to {} was not granted", path.display())]
    AccessDenied { path: PathBuf },
    #[error("failed to copy into {}: {source}", destination.display())]
    Copy {
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{message}")]
    InvalidSource { message: String },
}

impl Error {
    #[must_use]
    pub fn source_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn copy(destination: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Copy {
            destination: destination.into(),
            source,
        }
    }

    #[must_use]
    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource {
            message: message.into(),
        }
    }
}

pub type MaterializationError = Error;
pub type Result<T> = std::result::Result<T, Error>;
