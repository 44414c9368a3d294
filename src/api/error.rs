//! API error handling.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::application::{AppError, ErrorKind};
use crate::domain::MinorUnits;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solde_actuel: Option<MinorUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant_demande: Option<MinorUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub montant_requis: Option<MinorUnits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frais: Option<MinorUnits>,
}

impl ErrorResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            solde_actuel: None,
            montant_demande: None,
            montant_requis: None,
            frais: None,
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err.kind() {
                ErrorKind::Validation
                | ErrorKind::InsufficientFunds
                | ErrorKind::Cancellation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => match err {
                    AppError::RoleNotAllowed { .. } => StatusCode::FORBIDDEN,
                    _ => StatusCode::BAD_REQUEST,
                },
                ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::App(AppError::InsufficientFunds {
                balance,
                required,
                fee,
                ..
            }) => {
                let mut body = ErrorResponse::message("Insufficient balance");
                body.solde_actuel = Some(*balance);
                match fee {
                    Some(fee) => {
                        body.montant_requis = Some(*required);
                        body.frais = Some(*fee);
                    }
                    None => body.montant_demande = Some(*required),
                }
                body
            }
            ApiError::App(AppError::Database(_)) => ErrorResponse::message("Internal server error"),
            other => ErrorResponse::message(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::AccountNotFound(1), StatusCode::NOT_FOUND),
            (AppError::WalletInactive(1), StatusCode::BAD_REQUEST),
            (
                AppError::RoleNotAllowed {
                    account_id: 1,
                    role: crate::domain::Role::Agent,
                    required: crate::domain::Role::Client,
                },
                StatusCode::FORBIDDEN,
            ),
            (AppError::NotCancellable(1), StatusCode::BAD_REQUEST),
            (
                AppError::Database(anyhow::anyhow!("locked")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_insufficient_funds_body() {
        let err = ApiError::from(AppError::InsufficientFunds {
            account_id: 1,
            balance: 100,
            required: 201,
            fee: Some(1),
        });
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["soldeActuel"], 100);
        assert_eq!(body["montantRequis"], 201);
        assert_eq!(body["frais"], 1);
        assert!(body.get("montantDemande").is_none());
    }

    #[test]
    fn test_database_errors_are_not_echoed() {
        let err = ApiError::from(AppError::Database(anyhow::anyhow!("secret path /var/db")));
        let body = err.body();
        assert_eq!(body.message, "Internal server error");
    }
}
