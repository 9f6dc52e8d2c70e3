use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::{
    AdminCatalogError, AdminContentError, AdminSettingsError, AdminTaxonomyError,
};
use crate::application::auth::AuthError;
use crate::application::error::ErrorReport;
use crate::application::ordering::OrderError;
use crate::application::repos::RepoError;
use crate::application::storefront::StorefrontError;
use crate::application::uploads::UploadError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const UPLOAD: &str = "upload_error";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const BANNED_WORD: &str = "banned_word";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const NOT_CONFIGURED: &str = "not_configured";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    /// Logged through the error report, never sent to the client.
    detail: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(message: &'static str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED, message, None)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn payload_too_large(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "Request body too large",
            hint,
        )
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Too many attempts".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let summary = format!(
            "{}: {}",
            self.code,
            self.detail
                .as_deref()
                .or(self.hint.as_deref())
                .unwrap_or(self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::from_message("infra::http", self.status, summary).attach(&mut response);
        response
    }
}

fn repo_to_api(err: &RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint.clone()),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message.clone()),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message.clone()),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            None,
        )
        .with_detail(message.clone()),
    }
}

fn invalid(message: &'static str, field: &'static str) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        codes::INVALID_INPUT,
        message,
        Some(field.to_string()),
    )
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        repo_to_api(&err)
    }
}

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::NotFound { entity } => {
                ApiError::not_found("Resource not found").with_detail(format!("{entity} not found"))
            }
            StorefrontError::Repo(repo) => repo_to_api(&repo),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(message) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid order",
                Some(message),
            ),
            OrderError::BannedWord { word } => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::BANNED_WORD,
                "Note contains a blocked word",
                Some(word),
            ),
            OrderError::ProductNotFound => ApiError::not_found("Product not found"),
            OrderError::Unavailable(reason) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UNAVAILABLE,
                "WhatsApp ordering is unavailable",
                Some(reason.to_string()),
            ),
            OrderError::Storefront(err) => ApiError::from(err),
            OrderError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::NOT_CONFIGURED,
                "Admin login is not configured",
                Some("set admin.password_sha256".to_string()),
            ),
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::Missing => ApiError::unauthorized("Admin session required"),
            AuthError::InvalidSession => ApiError::unauthorized("Session expired or invalid"),
            AuthError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<AdminCatalogError> for ApiError {
    fn from(err: AdminCatalogError) -> Self {
        match err {
            AdminCatalogError::ConstraintViolation(field) => invalid("Invalid catalog entry", field),
            AdminCatalogError::NotFound { entity } => {
                ApiError::not_found("Resource not found").with_detail(format!("{entity} not found"))
            }
            AdminCatalogError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<AdminTaxonomyError> for ApiError {
    fn from(err: AdminTaxonomyError) -> Self {
        match err {
            AdminTaxonomyError::ConstraintViolation(field) => invalid("Invalid taxonomy", field),
            AdminTaxonomyError::NotFound(kind) => ApiError::not_found("Resource not found")
                .with_detail(format!("{} not found", kind.as_str())),
            AdminTaxonomyError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<AdminContentError> for ApiError {
    fn from(err: AdminContentError) -> Self {
        match err {
            AdminContentError::ConstraintViolation(field) => invalid("Invalid content", field),
            AdminContentError::NotFound { entity } => {
                ApiError::not_found("Resource not found").with_detail(format!("{entity} not found"))
            }
            AdminContentError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<AdminSettingsError> for ApiError {
    fn from(err: AdminSettingsError) -> Self {
        match err {
            AdminSettingsError::ConstraintViolation(field) => invalid("Invalid setting", field),
            AdminSettingsError::Repo(err) => repo_to_api(&err),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(message) => ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::UPLOAD,
                "Invalid upload",
                Some(message.to_string()),
            ),
            UploadError::Storage(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::UPLOAD,
                "Failed to store upload",
                None,
            )
            .with_detail(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn error_body_has_code_message_and_hint() {
        let response = ApiError::from(RepoError::Duplicate {
            constraint: "products_slug_key".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(response.extensions().get::<ErrorReport>().is_some());
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], codes::DUPLICATE);
        assert_eq!(json["error"]["hint"], "products_slug_key");
    }

    #[tokio::test]
    async fn persistence_details_stay_out_of_the_body() {
        let response =
            ApiError::from(RepoError::Persistence("connection refused".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].get("hint").is_none());
    }

    #[test]
    fn order_errors_map_to_expected_statuses() {
        assert_eq!(
            ApiError::from(OrderError::BannedWord {
                word: "spam".to_string()
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(OrderError::Unavailable("disabled")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(OrderError::ProductNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn auth_errors_are_unauthorized() {
        assert_eq!(
            ApiError::from(AuthError::InvalidSession).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ApiError::rate_limited(30);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("30")
        );
    }
}
