use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use rekber_payment_engine::{OrderFlowError, QrisApiError, qris::QrisError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
    #[error(transparent)]
    Qris(#[from] QrisApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::OrderFlow(e) => match e {
                OrderFlowError::ValidationError(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderFlowError::OrderNotFound(_) |
                OrderFlowError::PaymentNotFound(_) |
                OrderFlowError::ProofNotFound(_) |
                OrderFlowError::CancellationRequestNotFound(_) |
                OrderFlowError::FundReleaseNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::InvalidTransition { .. } |
                OrderFlowError::RequestAlreadyProcessed |
                OrderFlowError::PendingRequestExists |
                OrderFlowError::ReleaseAlreadyCompleted |
                OrderFlowError::ProofAlreadyReviewed => StatusCode::CONFLICT,
                OrderFlowError::OrderCooldown { .. } => StatusCode::TOO_MANY_REQUESTS,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Qris(e) => match e {
                QrisApiError::NoActiveQris |
                QrisApiError::SettingsNotFound(_) |
                QrisApiError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                QrisApiError::Codec(QrisError::InvalidAmount) => StatusCode::BAD_REQUEST,
                QrisApiError::Codec(_) => StatusCode::UNPROCESSABLE_ENTITY,
                QrisApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Database and configuration failures carry internals (SQL, paths) that must not leak to clients.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("💻️ Internal server error: {self}");
            return HttpResponse::build(status)
                .insert_header(ContentType::json())
                .body(serde_json::json!({ "error": "Internal server error" }).to_string());
        }
        let mut builder = HttpResponse::build(status);
        builder.insert_header(ContentType::json());
        if let Self::OrderFlow(OrderFlowError::OrderCooldown { retry_after_secs }) = self {
            builder.insert_header(("Retry-After", retry_after_secs.to_string()));
            return builder
                .body(serde_json::json!({ "error": self.to_string(), "retry_after_secs": retry_after_secs }).to_string());
        }
        builder.body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
