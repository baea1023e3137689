use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Error taxonomy for the intake API.
///
/// Every variant maps to a machine-readable kind plus an HTTP status; the
/// human message is safe to return to the client (internal detail stays in
/// the logs).
#[derive(Debug, Clone)]
pub enum ApiError {
    /// No bearer credential supplied on a protected route.
    NoCredential,
    /// Credential present but unverifiable: bad signature, wrong algorithm, expired.
    InvalidCredential,
    /// Structural or business validation rejected the payload.
    ValidationFailed(String),
    /// The owning complaint id is missing, unparseable, or unknown.
    MissingOrInvalidTarget(String),
    /// Declared media type is outside the allow-list.
    UnsupportedType(String),
    /// Leading content bytes disagree with the declared media type.
    SignatureMismatch(String),
    /// The malware scanner flagged the file.
    MalwareDetected(String),
    /// The atomic create procedure returned no row. Never expected; alert, do not retry.
    PersistenceInvariantViolation,
    /// Unclassified internal fault (includes fail-closed scanner errors).
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NoCredential => write!(f, "Authorization bearer token required"),
            ApiError::InvalidCredential => write!(f, "Invalid or expired token"),
            ApiError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ApiError::MissingOrInvalidTarget(msg) => write!(f, "Missing or invalid target: {}", msg),
            ApiError::UnsupportedType(msg) => write!(f, "Unsupported file type: {}", msg),
            ApiError::SignatureMismatch(msg) => write!(f, "File signature mismatch: {}", msg),
            ApiError::MalwareDetected(msg) => write!(f, "File rejected by malware scan: {}", msg),
            ApiError::PersistenceInvariantViolation => {
                write!(f, "Complaint persistence returned no result")
            }
            ApiError::Internal(_) => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Machine-readable error kind returned in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NoCredential => "NO_TOKEN",
            ApiError::InvalidCredential => "INVALID_TOKEN",
            ApiError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApiError::MissingOrInvalidTarget(_) => "MISSING_OR_INVALID_TARGET",
            ApiError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            ApiError::SignatureMismatch(_) => "SIGNATURE_MISMATCH",
            ApiError::MalwareDetected(_) => "MALWARE_DETECTED",
            ApiError::PersistenceInvariantViolation => "PERSISTENCE_INVARIANT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ApiError::NoCredential | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::MissingOrInvalidTarget(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedType(_)
            | ApiError::SignatureMismatch(_)
            | ApiError::MalwareDetected(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PersistenceInvariantViolation | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Log the rejection with a level matching its security weight.
    pub fn log_security_event(&self) {
        match self {
            ApiError::NoCredential => {
                tracing::debug!("Request without bearer credential rejected");
            }
            ApiError::InvalidCredential => {
                tracing::warn!("Invalid or expired credential presented");
            }
            ApiError::SignatureMismatch(msg) => {
                tracing::warn!("SECURITY: content-type spoofing attempt blocked: {}", msg);
            }
            ApiError::MalwareDetected(msg) => {
                tracing::warn!("SECURITY: malware detected in upload: {}", msg);
            }
            ApiError::PersistenceInvariantViolation => {
                tracing::error!("FATAL: atomic complaint insert returned no row");
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal fault: {}", detail);
            }
            other => {
                tracing::debug!("Request rejected: {}", other);
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        self.log_security_event();
        HttpResponse::build(self.http_status()).json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::NoCredential.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::ValidationFailed("x".into()).http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::MissingOrInvalidTarget("x".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::SignatureMismatch("x".into()).http_status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::PersistenceInvariantViolation.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_does_not_leak_detail() {
        let err = ApiError::Internal("connection to 10.0.0.3:3310 refused".into());
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.kind(), "INTERNAL");
    }
}
