use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{SlugFailure, default_visible, optional, required, slug_for_create, slug_for_update};
use crate::application::repos::{
    CatalogRepo, CatalogWriteRepo, CollectionParams, ProductParams, ProductQueryFilter, RepoError,
};
use crate::application::storefront::{ProductDetail, StorefrontCache};
use crate::domain::entities::{CollectionRecord, ProductRecord, RecordRef};
use crate::domain::types::{ListScope, TaxonomyKind};

const DEFAULT_CURRENCY: &str = "IDR";

#[derive(Debug, Error)]
pub enum AdminCatalogError {
    #[error("invalid value for `{0}`")]
    ConstraintViolation(&'static str),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminCatalogError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Field(field) => AdminCatalogError::ConstraintViolation(field),
            SlugFailure::Repo(err) => AdminCatalogError::Repo(err),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_in_stock() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionCommand {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductCommand {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub compare_at_price_cents: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// Product fields after validation; the slug is resolved separately.
struct ValidProduct {
    name: String,
    description: Option<String>,
    price_cents: i64,
    compare_at_price_cents: Option<i64>,
    currency: String,
    images: Vec<String>,
    collection_id: Option<Uuid>,
    in_stock: bool,
    visible: bool,
    sort_order: i32,
}

impl ValidProduct {
    fn into_params(self, slug: String) -> ProductParams {
        ProductParams {
            slug,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            compare_at_price_cents: self.compare_at_price_cents,
            currency: self.currency,
            images: self.images,
            collection_id: self.collection_id,
            in_stock: self.in_stock,
            visible: self.visible,
            sort_order: self.sort_order,
        }
    }
}

#[derive(Clone)]
pub struct AdminCatalogService {
    reader: Arc<dyn CatalogRepo>,
    writer: Arc<dyn CatalogWriteRepo>,
    cache: Arc<StorefrontCache>,
}

impl AdminCatalogService {
    pub fn new(
        reader: Arc<dyn CatalogRepo>,
        writer: Arc<dyn CatalogWriteRepo>,
        cache: Arc<StorefrontCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn list_collections(&self) -> Result<Vec<CollectionRecord>, AdminCatalogError> {
        self.reader
            .list_collections(ListScope::Admin)
            .await
            .map_err(AdminCatalogError::from)
    }

    pub async fn collection(&self, id: Uuid) -> Result<CollectionRecord, AdminCatalogError> {
        self.reader
            .find_collection_by_id(id)
            .await?
            .ok_or(AdminCatalogError::NotFound {
                entity: "collection",
            })
    }

    pub async fn create_collection(
        &self,
        command: CollectionCommand,
    ) -> Result<CollectionRecord, AdminCatalogError> {
        let name = required(&command.name, "name").map_err(AdminCatalogError::ConstraintViolation)?;

        let reader = self.reader.clone();
        let slug = slug_for_create(command.slug.as_deref(), &name, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_collection_by_slug(ListScope::Admin, &candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let params = CollectionParams {
            slug,
            name,
            description: optional(command.description),
            image_url: optional(command.image_url),
            visible: command.visible,
            sort_order: command.sort_order,
        };

        let collection = self.writer.create_collection(params).await?;
        self.written("collection.create", collection.id);
        Ok(collection)
    }

    pub async fn update_collection(
        &self,
        id: Uuid,
        command: CollectionCommand,
    ) -> Result<CollectionRecord, AdminCatalogError> {
        let name = required(&command.name, "name").map_err(AdminCatalogError::ConstraintViolation)?;
        let existing = self.collection(id).await?;
        let slug = slug_for_update(command.slug.as_deref(), &existing.slug)?;

        let params = CollectionParams {
            slug,
            name,
            description: optional(command.description),
            image_url: optional(command.image_url),
            visible: command.visible,
            sort_order: command.sort_order,
        };

        let collection = self.writer.update_collection(id, params).await?;
        self.written("collection.update", id);
        Ok(collection)
    }

    pub async fn delete_collection(&self, id: Uuid) -> Result<(), AdminCatalogError> {
        self.writer.delete_collection(id).await?;
        self.written("collection.delete", id);
        Ok(())
    }

    pub async fn list_products(
        &self,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, AdminCatalogError> {
        self.reader
            .list_products(ListScope::Admin, filter)
            .await
            .map_err(AdminCatalogError::from)
    }

    pub async fn product(&self, id: Uuid) -> Result<ProductDetail, AdminCatalogError> {
        let product = self
            .reader
            .find_product_by_id(id)
            .await?
            .ok_or(AdminCatalogError::NotFound { entity: "product" })?;
        let (celebrations, relationships) = tokio::try_join!(
            self.reader
                .list_product_taxonomies(id, TaxonomyKind::Celebration),
            self.reader
                .list_product_taxonomies(id, TaxonomyKind::Relationship),
        )?;

        Ok(ProductDetail {
            product,
            celebrations,
            relationships,
        })
    }

    pub async fn create_product(
        &self,
        command: ProductCommand,
    ) -> Result<ProductRecord, AdminCatalogError> {
        let explicit_slug = command.slug.clone();
        let valid = self.validate_product(command).await?;

        let reader = self.reader.clone();
        let slug = slug_for_create(explicit_slug.as_deref(), &valid.name, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_product_by_slug(ListScope::Admin, &candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let product = self.writer.create_product(valid.into_params(slug)).await?;
        self.written("product.create", product.id);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        command: ProductCommand,
    ) -> Result<ProductRecord, AdminCatalogError> {
        let explicit_slug = command.slug.clone();
        let valid = self.validate_product(command).await?;
        let existing = self
            .reader
            .find_product_by_id(id)
            .await?
            .ok_or(AdminCatalogError::NotFound { entity: "product" })?;
        let slug = slug_for_update(explicit_slug.as_deref(), &existing.slug)?;

        let product = self
            .writer
            .update_product(id, valid.into_params(slug))
            .await?;
        self.written("product.update", id);
        Ok(product)
    }

    pub async fn set_product_visibility(
        &self,
        id: Uuid,
        visible: bool,
    ) -> Result<ProductRecord, AdminCatalogError> {
        let product = self.writer.set_product_visibility(id, visible).await?;
        self.written("product.visibility", id);
        Ok(product)
    }

    pub async fn delete_product(&self, id: Uuid) -> Result<(), AdminCatalogError> {
        self.writer.delete_product(id).await?;
        self.written("product.delete", id);
        Ok(())
    }

    /// Replace a product's celebration or relationship links wholesale.
    pub async fn replace_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
        taxonomy_ids: Vec<Uuid>,
    ) -> Result<Vec<RecordRef>, AdminCatalogError> {
        if self.reader.find_product_by_id(product_id).await?.is_none() {
            return Err(AdminCatalogError::NotFound { entity: "product" });
        }

        let mut ids = Vec::with_capacity(taxonomy_ids.len());
        for id in taxonomy_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let links = self
            .writer
            .replace_product_taxonomies(product_id, kind, &ids)
            .await?;
        self.written(
            match kind {
                TaxonomyKind::Celebration => "product.celebrations",
                TaxonomyKind::Relationship => "product.relationships",
            },
            product_id,
        );
        Ok(links)
    }

    async fn validate_product(
        &self,
        command: ProductCommand,
    ) -> Result<ValidProduct, AdminCatalogError> {
        let name = required(&command.name, "name").map_err(AdminCatalogError::ConstraintViolation)?;
        if command.price_cents < 0 {
            return Err(AdminCatalogError::ConstraintViolation("price_cents"));
        }
        if command.compare_at_price_cents.is_some_and(|value| value < 0) {
            return Err(AdminCatalogError::ConstraintViolation(
                "compare_at_price_cents",
            ));
        }
        let currency = normalize_currency(&command.currency)
            .ok_or(AdminCatalogError::ConstraintViolation("currency"))?;

        if let Some(collection_id) = command.collection_id {
            let exists = self
                .reader
                .find_collection_by_id(collection_id)
                .await?
                .is_some();
            if !exists {
                return Err(AdminCatalogError::ConstraintViolation("collection_id"));
            }
        }

        let images = command
            .images
            .into_iter()
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty())
            .collect();

        Ok(ValidProduct {
            name,
            description: optional(command.description),
            price_cents: command.price_cents,
            compare_at_price_cents: command.compare_at_price_cents,
            currency,
            images,
            collection_id: command.collection_id,
            in_stock: command.in_stock,
            visible: command.visible,
            sort_order: command.sort_order,
        })
    }

    fn written(&self, action: &'static str, id: Uuid) {
        self.cache.invalidate_all();
        info!(target = "florette::admin", action, %id, "catalog updated");
    }
}

/// Three-letter ISO 4217 style code, upper-cased.
fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (code.len() == 3 && code.chars().all(|ch| ch.is_ascii_uppercase())).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_are_normalized() {
        assert_eq!(normalize_currency(" idr ").as_deref(), Some("IDR"));
        assert_eq!(normalize_currency("usd").as_deref(), Some("USD"));
        assert_eq!(normalize_currency("rupiah"), None);
        assert_eq!(normalize_currency("U$D"), None);
    }

    #[test]
    fn product_command_defaults() {
        let command: ProductCommand =
            serde_json::from_str(r#"{"name":"Blush","price_cents":150000}"#).expect("json");
        assert_eq!(command.currency, "IDR");
        assert!(command.visible);
        assert!(command.in_stock);
        assert!(command.images.is_empty());
        assert_eq!(command.collection_id, None);
    }
}
