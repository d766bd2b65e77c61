use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error on {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    #[error("Not found on {endpoint}: {message}")]
    NotFound { endpoint: String, message: String },

    #[error("API quota exhausted on {endpoint}: {message}")]
    QuotaExceeded { endpoint: String, message: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transform error: {message}")]
    Transform { message: String },

    #[error("Warehouse error: {message}")]
    Warehouse { message: String },

    #[error("Warehouse table '{table}' is missing columns: {}", missing.join(", "))]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EtlError {
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        EtlError::Api {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Prefix an API failure with what the request was for (phrase, channel, playlist,
    /// id batch). Other errors pass through unchanged.
    pub fn with_target(self, target: impl std::fmt::Display) -> Self {
        match self {
            EtlError::Api { endpoint, message } => EtlError::Api {
                endpoint,
                message: format!("{target}: {message}"),
            },
            EtlError::NotFound { endpoint, message } => EtlError::NotFound {
                endpoint,
                message: format!("{target}: {message}"),
            },
            EtlError::QuotaExceeded { endpoint, message } => EtlError::QuotaExceeded {
                endpoint,
                message: format!("{target}: {message}"),
            },
            other => other,
        }
    }

    pub fn warehouse(message: impl Into<String>) -> Self {
        EtlError::Warehouse {
            message: message.into(),
        }
    }

    pub fn transform(message: impl Into<String>) -> Self {
        EtlError::Transform {
            message: message.into(),
        }
    }
}

impl From<libsql::Error> for EtlError {
    fn from(err: libsql::Error) -> Self {
        EtlError::Warehouse {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
