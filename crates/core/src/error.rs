use thiserror::Error;

/// Failures raised while exploring a management controller.
///
/// Transport failures ([`ProbeError::Connection`], [`ProbeError::Http`] and
/// [`ProbeError::Parse`]) are absorbed by the builders: the affected branch of
/// the resource tree yields nothing. The remaining variants describe
/// documents that lack something the traversal expected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    #[error("Failed to connect for {path}: {cause}")]
    Connection { path: String, cause: String },

    #[error("GET {path} returned HTTP {status} {reason}")]
    Http {
        path: String,
        status: u16,
        reason: String,
    },

    #[error("Failed to parse {path} as JSON: {cause}")]
    Parse { path: String, cause: String },

    #[error("{document} has no {key} link")]
    MissingLink { document: String, key: String },

    #[error("{document} has no {field} field")]
    MissingField { document: String, field: String },
}

impl ProbeError {
    /// Whether the failure happened while fetching a document.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProbeError::Connection { .. } | ProbeError::Http { .. } | ProbeError::Parse { .. }
        )
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
