//! Typed error hierarchy for the tracking server.
//!
//! Two enums cover the non-HTTP subsystems: `AuthError` for credential
//! and token verification failures, `ExcelError` for workbook ingestion
//! and lookup failures.
//!
//! The HTTP layer maps both onto `api::ApiError` responses; the storage
//! layer reports through `anyhow` and surfaces as internal errors.

use thiserror::Error;

/// Errors from credential checks and token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid phone number or password")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Refresh token rejected")]
    RefreshRejected,
}

/// Errors from the workbook ingestion subsystem.
#[derive(Debug, Error)]
pub enum ExcelError {
    #[error("Unsupported file format: {file_name} (expected .xlsx)")]
    UnsupportedFormat { file_name: String },

    #[error("No active workbook has been uploaded")]
    NoActiveFile,

    #[error("File {name} not found")]
    FileNotFound { name: String },

    #[error("Invalid file name: {name}")]
    InvalidFileName { name: String },

    #[error("Workbook read failed: {0}")]
    Workbook(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_invalid_credentials_message() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "Invalid phone number or password");
    }

    #[test]
    fn auth_error_token_invalid_carries_reason() {
        let err = AuthError::TokenInvalid("signature mismatch".into());
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn excel_error_unsupported_format_carries_name() {
        let err = ExcelError::UnsupportedFormat {
            file_name: "orders.csv".into(),
        };
        assert!(err.to_string().contains("orders.csv"));
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn excel_error_converts_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ExcelError = io_err.into();
        assert!(matches!(err, ExcelError::Io(_)));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&AuthError::RefreshRejected);
        assert_std_error(&ExcelError::NoActiveFile);
    }
}
