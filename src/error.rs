use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    Io(std::io::Error),

    #[from]
    #[display("Catalog storage error: {_0}")]
    Storage(rusqlite::Error),

    #[display("Invalid package: {msg}")]
    Validation { msg: String },

    #[display("Package not found: {pkgname}")]
    PackageNotFound { pkgname: String },

    #[display("Catalog is not running")]
    CatalogUnavailable,

    #[display("Configuration error: {msg}")]
    Config { msg: String },
}

impl std::error::Error for Error {}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation { msg: msg.into() }
    }
}

// Implement axum IntoResponse for Error
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::Validation { msg } => {
                tracing::warn!("Rejected request: {}", msg);
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    format!("Invalid package: {}", msg),
                )
            }
            Error::PackageNotFound { pkgname } => (
                axum::http::StatusCode::NOT_FOUND,
                format!("Package not found: {}", pkgname),
            ),
            Error::Storage(e) => {
                tracing::error!("Catalog storage error: {}", e);
                // Never expose SQL or file paths
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::CatalogUnavailable => {
                tracing::error!("Catalog actor is not accepting requests");
                (
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                    "Registry is shutting down".to_string(),
                )
            }
            Error::Config { msg } => {
                tracing::error!("Configuration error: {}", msg);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
        };

        let body = axum::Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
