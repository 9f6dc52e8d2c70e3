use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::admin::catalog::{CollectionCommand, ProductCommand};
use crate::application::admin::taxonomy::TaxonomyCommand;
use crate::domain::types::TaxonomyKind;
use crate::infra::http::error::ApiError;
use crate::infra::http::public::{ItemsResponse, ProductListQuery};

use super::AdminState;

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaxonomyLinksRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

pub async fn list_products(
    State(state): State<AdminState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.catalog.list_products(&query.into_filter()).await?;
    Ok(Json(ItemsResponse::new(products)))
}

pub async fn get_product(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.product(id).await?))
}

pub async fn create_product(
    State(state): State<AdminState>,
    Json(command): Json<ProductCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.catalog.create_product(command).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<ProductCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.update_product(id, command).await?))
}

pub async fn set_product_visibility(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(request): Json<VisibilityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .catalog
            .set_product_visibility(id, request.visible)
            .await?,
    ))
}

pub async fn delete_product(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn replace_product_celebrations(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TaxonomyLinksRequest>,
) -> Result<impl IntoResponse, ApiError> {
    replace_links(&state, id, TaxonomyKind::Celebration, request).await
}

pub async fn replace_product_relationships(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TaxonomyLinksRequest>,
) -> Result<impl IntoResponse, ApiError> {
    replace_links(&state, id, TaxonomyKind::Relationship, request).await
}

async fn replace_links(
    state: &AdminState,
    product_id: Uuid,
    kind: TaxonomyKind,
    request: TaxonomyLinksRequest,
) -> Result<Response, ApiError> {
    let linked = state
        .catalog
        .replace_product_taxonomies(product_id, kind, request.ids)
        .await?;
    Ok(Json(ItemsResponse::new(linked)).into_response())
}

pub async fn list_collections(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ItemsResponse::new(
        state.catalog.list_collections().await?,
    )))
}

pub async fn get_collection(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.collection(id).await?))
}

pub async fn create_collection(
    State(state): State<AdminState>,
    Json(command): Json<CollectionCommand>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = state.catalog.create_collection(command).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn update_collection(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<CollectionCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.update_collection(id, command).await?))
}

pub async fn delete_collection(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_collection(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Celebrations and relationships share one service keyed by kind.

pub async fn list_celebrations(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    list_taxonomies(&state, TaxonomyKind::Celebration).await
}

pub async fn get_celebration(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.taxonomy.find(TaxonomyKind::Celebration, id).await?,
    ))
}

pub async fn create_celebration(
    State(state): State<AdminState>,
    Json(command): Json<TaxonomyCommand>,
) -> Result<impl IntoResponse, ApiError> {
    create_taxonomy(&state, TaxonomyKind::Celebration, command).await
}

pub async fn update_celebration(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<TaxonomyCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .taxonomy
            .update(TaxonomyKind::Celebration, id, command)
            .await?,
    ))
}

pub async fn delete_celebration(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .taxonomy
        .delete(TaxonomyKind::Celebration, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_relationships(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, ApiError> {
    list_taxonomies(&state, TaxonomyKind::Relationship).await
}

pub async fn get_relationship(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.taxonomy.find(TaxonomyKind::Relationship, id).await?,
    ))
}

pub async fn create_relationship(
    State(state): State<AdminState>,
    Json(command): Json<TaxonomyCommand>,
) -> Result<impl IntoResponse, ApiError> {
    create_taxonomy(&state, TaxonomyKind::Relationship, command).await
}

pub async fn update_relationship(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(command): Json<TaxonomyCommand>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .taxonomy
            .update(TaxonomyKind::Relationship, id, command)
            .await?,
    ))
}

pub async fn delete_relationship(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .taxonomy
        .delete(TaxonomyKind::Relationship, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_taxonomies(
    state: &AdminState,
    kind: TaxonomyKind,
) -> Result<Response, ApiError> {
    Ok(Json(ItemsResponse::new(state.taxonomy.list(kind).await?)).into_response())
}

async fn create_taxonomy(
    state: &AdminState,
    kind: TaxonomyKind,
    command: TaxonomyCommand,
) -> Result<Response, ApiError> {
    let record = state.taxonomy.create(kind, command).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}
