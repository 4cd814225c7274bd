use std::fmt;

/// Errors raised while reading hits, clustering them into features, or
/// reading and writing GFF3.
#[derive(Debug)]
pub enum Error {
    /// The source file does not exist
    NotFound {
        /// The path that was requested
        path: String,
    },
    /// A record could not be converted
    Parse {
        /// Line number for flat files, HSP ordinal for XML (1-based)
        record: usize,
        /// A human-readable message explaining the error
        message: String,
    },
    /// A value violates the feature model (bad strand, malformed escape, ...)
    Validation(String),
    /// Malformed XML in a tree-structured hit file
    Xml(String),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(record: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            record,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Attaches a record number to an error raised while converting one record.
    pub(crate) fn at_record(self, record: usize) -> Self {
        match self {
            Error::Parse { message, .. } => Error::Parse { record, message },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { path } => write!(f, "Could not find {}", path),
            Error::Parse { record, message } => {
                write!(f, "Parse error at record {}: {}", record, message)
            }
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::Xml(msg) => write!(f, "XML error: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(error: quick_xml::Error) -> Self {
        Error::Xml(error.to_string())
    }
}
