//! Storefront listener: read-only catalog JSON, WhatsApp ordering and stored uploads.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::ordering::{OrderingService, WhatsappOrderCommand};
use crate::application::repos::{HealthRepo, ProductQueryFilter};
use crate::application::storefront::{Listing, StorefrontService};
use crate::application::uploads::UploadService;
use crate::domain::types::TaxonomyKind;
use crate::infra::uploads::UploadStorageError;

use super::db_health_response;
use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct PublicState {
    pub storefront: StorefrontService,
    pub ordering: OrderingService,
    pub uploads: Arc<UploadService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/products", get(products))
        .route("/api/products/{slug}", get(product))
        .route("/api/collections", get(collections))
        .route("/api/collections/{slug}", get(collection))
        .route("/api/celebrations", get(celebrations))
        .route("/api/celebrations/{slug}", get(celebration))
        .route("/api/relationships", get(relationships))
        .route("/api/relationships/{slug}", get(relationship))
        .route("/api/testimonials", get(testimonials))
        .route("/api/banners", get(banners))
        .route("/api/featured", get(featured))
        .route("/api/announcements", get(announcements))
        .route("/api/review-videos", get(review_videos))
        .route("/api/settings", get(settings))
        .route("/api/orders/whatsapp", post(whatsapp_order))
        .route("/uploads/{*path}", get(serve_upload))
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// List payload shared by every collection endpoint.
#[derive(Debug, Serialize)]
pub struct ItemsResponse<T: Serialize> {
    pub items: T,
    /// Set when the items come from the built-in catalog instead of the store.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

impl<T: Serialize> ItemsResponse<T> {
    pub fn new(items: T) -> Self {
        Self {
            items,
            fallback: false,
        }
    }
}

impl<T> From<Listing<T>> for ItemsResponse<Arc<Vec<T>>>
where
    T: Serialize,
{
    fn from(listing: Listing<T>) -> Self {
        Self {
            items: listing.items,
            fallback: listing.fallback,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub collection: Option<String>,
    pub celebration: Option<String>,
    pub relationship: Option<String>,
    pub search: Option<String>,
}

impl ProductListQuery {
    pub fn into_filter(self) -> ProductQueryFilter {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        ProductQueryFilter {
            collection: clean(self.collection),
            celebration: clean(self.celebration),
            relationship: clean(self.relationship),
            search: clean(self.search),
        }
    }
}

async fn home(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.storefront.home().await?))
}

async fn products(
    State(state): State<PublicState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.storefront.products(&query.into_filter()).await?;
    Ok(Json(ItemsResponse::from(listing)))
}

async fn product(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.storefront.product(&slug).await?))
}

async fn collections(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let listing = state.storefront.collections().await?;
    Ok(Json(ItemsResponse::from(listing)))
}

async fn collection(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.storefront.collection(&slug).await?))
}

async fn celebrations(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    taxonomies(&state, TaxonomyKind::Celebration).await
}

async fn celebration(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .storefront
            .taxonomy(TaxonomyKind::Celebration, &slug)
            .await?,
    ))
}

async fn relationships(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    taxonomies(&state, TaxonomyKind::Relationship).await
}

async fn relationship(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .storefront
            .taxonomy(TaxonomyKind::Relationship, &slug)
            .await?,
    ))
}

async fn taxonomies(state: &PublicState, kind: TaxonomyKind) -> Result<Response, ApiError> {
    let items = state.storefront.taxonomies(kind).await?;
    Ok(Json(ItemsResponse::new(items)).into_response())
}

async fn testimonials(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    let listing = state.storefront.testimonials().await?;
    Ok(Json(ItemsResponse::from(listing)))
}

async fn banners(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.storefront.banners().await?)))
}

async fn featured(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.storefront.featured().await?)))
}

async fn announcements(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.storefront.announcements().await?,
    )))
}

async fn review_videos(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.storefront.review_videos().await?,
    )))
}

async fn settings(State(state): State<PublicState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.storefront.settings().await?))
}

async fn whatsapp_order(
    State(state): State<PublicState>,
    Json(command): Json<WhatsappOrderCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ordering.whatsapp_order(command).await?))
}

async fn serve_upload(State(state): State<PublicState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_upload";

    match state.uploads.read(&path).await {
        Ok((bytes, content_type)) => build_upload_response(&content_type, bytes),
        Err(UploadStorageError::InvalidPath) => {
            ApiError::not_found("Upload not found").into_response()
        }
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            ApiError::not_found("Upload not found").into_response()
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored upload"
            );
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                super::error::codes::UPLOAD,
                "Failed to read uploaded file",
                None,
            )
            .with_detail(err.to_string())
            .into_response()
        }
    }
}

async fn public_health(State(state): State<PublicState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn build_upload_response(content_type: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // stored names carry a timestamp, so a path never changes content
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
