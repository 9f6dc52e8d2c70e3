//! Back-office listener: cookie-authenticated JSON API over every storefront record.

mod catalog;
mod content;
mod session;
mod settings;
mod uploads;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::CookieJar;

use crate::application::admin::{
    AdminCatalogService, AdminContentService, AdminSettingsService, AdminTaxonomyService,
};
use crate::application::auth::AdminAuthService;
use crate::application::repos::HealthRepo;
use crate::application::storefront::StorefrontCache;
use crate::application::uploads::UploadService;

use super::db_health_response;
use super::error::ApiError;
use super::middleware::{log_responses, set_request_context};
use super::rate_limit::LoginRateLimiter;

pub const SESSION_COOKIE: &str = "florette_admin";

#[derive(Clone)]
pub struct AdminState {
    pub auth: Arc<AdminAuthService>,
    pub catalog: Arc<AdminCatalogService>,
    pub taxonomy: Arc<AdminTaxonomyService>,
    pub content: Arc<AdminContentService>,
    pub settings: Arc<AdminSettingsService>,
    pub uploads: Arc<UploadService>,
    pub cache: Arc<StorefrontCache>,
    pub health: Arc<dyn HealthRepo>,
    pub login_limiter: LoginRateLimiter,
    pub cookie_secure: bool,
    pub max_request_bytes: usize,
}

pub fn build_admin_router(state: AdminState) -> Router {
    let body_limit = state.max_request_bytes;

    let protected = Router::new()
        .route(
            "/api/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/api/products/{id}",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/api/products/{id}/visibility",
            put(catalog::set_product_visibility),
        )
        .route(
            "/api/products/{id}/celebrations",
            put(catalog::replace_product_celebrations),
        )
        .route(
            "/api/products/{id}/relationships",
            put(catalog::replace_product_relationships),
        )
        .route(
            "/api/collections",
            get(catalog::list_collections).post(catalog::create_collection),
        )
        .route(
            "/api/collections/{id}",
            get(catalog::get_collection)
                .put(catalog::update_collection)
                .delete(catalog::delete_collection),
        )
        .route(
            "/api/celebrations",
            get(catalog::list_celebrations).post(catalog::create_celebration),
        )
        .route(
            "/api/celebrations/{id}",
            get(catalog::get_celebration)
                .put(catalog::update_celebration)
                .delete(catalog::delete_celebration),
        )
        .route(
            "/api/relationships",
            get(catalog::list_relationships).post(catalog::create_relationship),
        )
        .route(
            "/api/relationships/{id}",
            get(catalog::get_relationship)
                .put(catalog::update_relationship)
                .delete(catalog::delete_relationship),
        )
        .route(
            "/api/testimonials",
            get(content::list_testimonials).post(content::create_testimonial),
        )
        .route(
            "/api/testimonials/{id}",
            get(content::get_testimonial)
                .put(content::update_testimonial)
                .delete(content::delete_testimonial),
        )
        .route(
            "/api/banners",
            get(content::list_banners).post(content::create_banner),
        )
        .route(
            "/api/banners/{id}",
            get(content::get_banner)
                .put(content::update_banner)
                .delete(content::delete_banner),
        )
        .route(
            "/api/featured",
            get(content::list_featured).post(content::create_featured_item),
        )
        .route(
            "/api/featured/{id}",
            get(content::get_featured_item)
                .put(content::update_featured_item)
                .delete(content::delete_featured_item),
        )
        .route(
            "/api/announcements",
            get(content::list_announcements).post(content::create_announcement),
        )
        .route(
            "/api/announcements/{id}",
            get(content::get_announcement)
                .put(content::update_announcement)
                .delete(content::delete_announcement),
        )
        .route(
            "/api/review-videos",
            get(content::list_review_videos).post(content::create_review_video),
        )
        .route(
            "/api/review-videos/{id}",
            get(content::get_review_video)
                .put(content::update_review_video)
                .delete(content::delete_review_video),
        )
        .route("/api/settings", get(settings::list_settings))
        .route(
            "/api/settings/{key}",
            put(settings::upsert_setting).delete(settings::delete_setting),
        )
        .route(
            "/api/whatsapp",
            get(settings::get_whatsapp).put(settings::update_whatsapp),
        )
        .route(
            "/api/banned-words",
            get(settings::list_banned_words).post(settings::add_banned_word),
        )
        .route(
            "/api/banned-words/{id}",
            delete(settings::remove_banned_word),
        )
        .route("/api/uploads", post(uploads::upload_file))
        .route("/api/cache", delete(settings::purge_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route(
            "/api/session",
            post(session::login)
                .get(session::current)
                .delete(session::logout),
        )
        .route("/_health/db", get(admin_health))
        .merge(protected)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Resolve the session cookie into an `AdminPrincipal` or answer 401.
async fn require_session(
    State(state): State<AdminState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default();

    let principal = match state.auth.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => return ApiError::from(err).into_response(),
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}
