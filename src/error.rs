use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Rejections raised before any document work starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File path cannot be empty")]
    EmptyInputPath,
    #[error("Output path cannot be empty")]
    EmptyOutputPath,
    #[error("Invalid file path detected")]
    InputTraversal,
    #[error("Invalid output path detected")]
    OutputTraversal,
    #[error("File does not exist")]
    NotFound(PathBuf),
    #[error("File must be an HTML file")]
    NotHtml(PathBuf),
    #[error("HTML file contains potentially unsafe content")]
    UnsafeContent(PathBuf),
    #[error("Error reading file: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot create output directory: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the document model: loading, parsing and saving packages.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },
    #[error("package is missing part {0}")]
    MissingPart(String),
    #[error("could not parse HTML: {0}")]
    Html(String),
    #[error("node {0} is not part of the document")]
    DetachedNode(usize),
    #[error("{0} called outside a table")]
    NoTable(&'static str),
    #[error("write failed: {0}")]
    Write(#[from] io::Error),
}

impl DocumentError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DocumentError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Conversion-fatal failures. Everything else is logged and skipped.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Input HTML file not found: {0}")]
    InputMissing(PathBuf),
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("conversion worker stopped unexpectedly: {0}")]
    Worker(String),
}
