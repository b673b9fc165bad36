use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid admin secret key")]
    InvalidAdminSecret,

    #[error("Registration failed")]
    RegistrationFailed(#[source] anyhow::Error),

    /// Unknown email and wrong password both land here.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Invalid folder, expected 'ingredients' or 'food'")]
    InvalidFolder,

    #[error("File must be an image")]
    InvalidContentType,

    #[error("Name must not be empty")]
    InvalidName,

    #[error("Failed to store file")]
    StorageFailed(#[source] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidAdminSecret | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidFolder
            | AppError::InvalidContentType
            | AppError::InvalidName
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RegistrationFailed(_)
            | AppError::StorageFailed(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection, "rejected json body");
        AppError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::warn!(error = %rejection, "rejected multipart body");
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::RegistrationFailed(cause)
            | AppError::StorageFailed(cause)
            | AppError::Internal(cause) => {
                tracing::error!(error = %self, cause = ?cause, "request failed");
            }
            _ => {}
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_status_codes() {
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidFolder.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::StorageFailed(anyhow::anyhow!("disk full")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_cause_is_not_exposed() {
        let err = AppError::RegistrationFailed(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn body_rejections_become_bad_request_with_detail() {
        use axum::{body::Body, extract::FromRequest, http::Request};

        let req = Request::post("/")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(req, &())
            .await
            .unwrap_err();
        let err = AppError::from(rejection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].as_str().is_some_and(|d| !d.is_empty()));
    }
}
