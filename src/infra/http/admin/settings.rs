use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use crate::application::admin::settings::{
    BannedWordCommand, SiteSettingCommand, WhatsappSettingsCommand,
};
use crate::infra::http::error::ApiError;
use crate::infra::http::public::ItemsResponse;

use super::AdminState;

pub async fn list_settings(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.settings.list().await?)))
}

pub async fn upsert_setting(
    State(state): State<AdminState>,
    Path(key): Path<String>,
    Json(command): Json<SiteSettingCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.upsert(&key, command).await?))
}

pub async fn delete_setting(
    State(state): State<AdminState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.settings.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_whatsapp(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.whatsapp().await?))
}

pub async fn update_whatsapp(
    State(state): State<AdminState>,
    Json(command): Json<WhatsappSettingsCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.settings.update_whatsapp(command).await?))
}

pub async fn list_banned_words(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(state.settings.banned_words().await?)))
}

pub async fn add_banned_word(
    State(state): State<AdminState>,
    Json(command): Json<BannedWordCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.settings.add_banned_word(command).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn remove_banned_word(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.settings.remove_banned_word(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn purge_cache(State(state): State<AdminState>) -> StatusCode {
    state.cache.invalidate_all();
    info!(target = "florette::admin::cache", "storefront cache purged manually");
    StatusCode::NO_CONTENT
}
