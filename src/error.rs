//! Error types for cbz operations.

use thiserror::Error;

/// Errors that can occur while reading or editing a comic archive.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("RAR error: {0}")]
    Rar(String),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Page number out of range: {0}")]
    PageOutOfRange(usize),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Missing entry: {0}")]
    MissingEntry(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("This archive is not writable")]
    NotWritable,

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<unrar::error::UnrarError> for Error {
    fn from(err: unrar::error::UnrarError) -> Self {
        Error::Rar(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
