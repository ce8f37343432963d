use thiserror::Error;

/// Failure signature shared by every connector vendor. Dialects map their
/// driver-specific errors onto these kinds instead of leaking raw errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectErrorKind {
    AuthenticationFailed,
    HostUnreachable,
    DatabaseNotFound,
    DriverMisconfigured,
}

impl ConnectErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectErrorKind::AuthenticationFailed => "authentication failed",
            ConnectErrorKind::HostUnreachable => "host unreachable",
            ConnectErrorKind::DatabaseNotFound => "database not found",
            ConnectErrorKind::DriverMisconfigured => "driver misconfigured",
        }
    }
}

impl std::fmt::Display for ConnectErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("connection failed ({kind}): {message}")]
    Connect {
        kind: ConnectErrorKind,
        message: String,
    },

    #[error("schema read failed for table {table}: {message}")]
    SchemaRead { table: String, message: String },

    #[error("enrichment service unavailable: {0}")]
    EnrichmentUnavailable(String),

    #[error("invalid source config: {0}")]
    InvalidConfig(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn connect(kind: ConnectErrorKind, message: impl Into<String>) -> Self {
        ImportError::Connect {
            kind,
            message: message.into(),
        }
    }

    pub fn schema_read(table: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::SchemaRead {
            table: table.into(),
            message: message.into(),
        }
    }

    /// The error class on which a resumable listing reconnects and retries
    /// the same offset instead of giving up.
    pub fn is_connection_drop(&self) -> bool {
        matches!(
            self,
            ImportError::Connect {
                kind: ConnectErrorKind::HostUnreachable,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
