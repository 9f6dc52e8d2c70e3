mod admin;
pub mod error;
mod middleware;
mod public;
pub mod rate_limit;

pub use admin::{AdminState, SESSION_COOKIE, build_admin_router};
pub use error::ApiError;
pub use public::{ItemsResponse, ProductListQuery, PublicState, build_public_router};
pub use rate_limit::LoginRateLimiter;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
