use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::application::admin::content::{
    AnnouncementCommand, BannerCommand, FeaturedItemCommand, ReviewVideoCommand,
    TestimonialCommand,
};
use crate::infra::http::error::ApiError;
use crate::infra::http::public::ItemsResponse;

use super::AdminState;

pub async fn list_testimonials(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.content.list_testimonials().await?,
    )))
}

pub async fn get_testimonial(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.testimonial(id).await?))
}

pub async fn create_testimonial(
    State(state): State<AdminState>,
    Json(command): Json<TestimonialCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.create_testimonial(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_testimonial(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<TestimonialCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.update_testimonial(id, command).await?))
}

pub async fn delete_testimonial(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_testimonial(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_banners(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.content.list_banners().await?)))
}

pub async fn get_banner(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.banner(id).await?))
}

pub async fn create_banner(
    State(state): State<AdminState>,
    Json(command): Json<BannerCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.create_banner(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_banner(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<BannerCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.update_banner(id, command).await?))
}

pub async fn delete_banner(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_banner(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_featured(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.content.list_featured().await?)))
}

pub async fn get_featured_item(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.featured_item(id).await?))
}

pub async fn create_featured_item(
    State(state): State<AdminState>,
    Json(command): Json<FeaturedItemCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.create_featured_item(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_featured_item(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<FeaturedItemCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.update_featured_item(id, command).await?))
}

pub async fn delete_featured_item(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_featured_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_announcements(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.content.list_announcements().await?,
    )))
}

pub async fn get_announcement(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.announcement(id).await?))
}

pub async fn create_announcement(
    State(state): State<AdminState>,
    Json(command): Json<AnnouncementCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.create_announcement(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_announcement(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<AnnouncementCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.update_announcement(id, command).await?))
}

pub async fn delete_announcement(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_announcement(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_review_videos(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.content.list_review_videos().await?,
    )))
}

pub async fn get_review_video(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.review_video(id).await?))
}

pub async fn create_review_video(
    State(state): State<AdminState>,
    Json(command): Json<ReviewVideoCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.content.create_review_video(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_review_video(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<ReviewVideoCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.update_review_video(id, command).await?))
}

pub async fn delete_review_video(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete_review_video(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
