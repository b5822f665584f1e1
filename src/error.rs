use serde::Serialize;
use thiserror::Error;

use crate::fields::Multiplicity;

/// Main library error type covering construction, encoding, decoding and validation
#[derive(Error, Debug)]
pub enum OaiError {
    #[error("Missing required field: {element}/{field}")]
    MissingRequiredField {
        element: &'static str,
        field: &'static str,
    },

    #[error("Cardinality violation: {element}/{field} expects {expected}, found {found}")]
    CardinalityViolation {
        element: &'static str,
        field: &'static str,
        expected: Multiplicity,
        found: usize,
    },

    #[error("Inconsistent {element}: {details}")]
    Inconsistent {
        element: &'static str,
        details: String,
    },

    #[error("Unsupported protocol version '{0}'")]
    UnsupportedProtocolVersion(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Schema violation: {message}")]
    SchemaViolation {
        message: String,
        errors: Vec<String>,
    },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema loading error: {source_name} - {details}")]
    SchemaLoad {
        source_name: String,
        details: String,
    },

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OaiError {
    pub(crate) fn malformed(details: impl Into<String>) -> Self {
        OaiError::MalformedDocument(details.into())
    }
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document validation failed with code {code}: {document}")]
    ValidationFailed { code: i32, document: String },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Invalid XML structure: {details}")]
    InvalidXml { details: String },
}

impl From<LibXml2Error> for OaiError {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::InvalidXml { details } => OaiError::MalformedDocument(details),
            other => OaiError::LibXml2Internal {
                details: other.to_string(),
            },
        }
    }
}

/// Protocol-level error codes that travel over the wire in an `error` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    BadArgument,
    BadResumptionToken,
    BadVerb,
    CannotDisseminateFormat,
    IdDoesNotExist,
    NoRecordsMatch,
    NoMetadataFormats,
    NoSetHierarchy,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::BadArgument,
        ErrorCode::BadResumptionToken,
        ErrorCode::BadVerb,
        ErrorCode::CannotDisseminateFormat,
        ErrorCode::IdDoesNotExist,
        ErrorCode::NoRecordsMatch,
        ErrorCode::NoMetadataFormats,
        ErrorCode::NoSetHierarchy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadArgument => "badArgument",
            ErrorCode::BadResumptionToken => "badResumptionToken",
            ErrorCode::BadVerb => "badVerb",
            ErrorCode::CannotDisseminateFormat => "cannotDisseminateFormat",
            ErrorCode::IdDoesNotExist => "idDoesNotExist",
            ErrorCode::NoRecordsMatch => "noRecordsMatch",
            ErrorCode::NoMetadataFormats => "noMetadataFormats",
            ErrorCode::NoSetHierarchy => "noSetHierarchy",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rejected request. These are ordinary client errors that get
/// reported back over the wire, never process failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RequestError {
    #[error("badVerb: {0}")]
    BadVerb(String),

    #[error("badArgument: {0}")]
    BadArgument(String),

    #[error("badResumptionToken: {0}")]
    BadResumptionToken(String),
}

impl RequestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RequestError::BadVerb(_) => ErrorCode::BadVerb,
            RequestError::BadArgument(_) => ErrorCode::BadArgument,
            RequestError::BadResumptionToken(_) => ErrorCode::BadResumptionToken,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RequestError::BadVerb(m)
            | RequestError::BadArgument(m)
            | RequestError::BadResumptionToken(m) => m,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OaiError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
