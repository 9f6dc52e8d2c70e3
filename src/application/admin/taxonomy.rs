use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{SlugFailure, default_visible, optional, required, slug_for_create, slug_for_update};
use crate::application::repos::{RepoError, TaxonomyParams, TaxonomyRepo, TaxonomyWriteRepo};
use crate::application::storefront::StorefrontCache;
use crate::domain::entities::TaxonomyRecord;
use crate::domain::types::{ListScope, TaxonomyKind};

#[derive(Debug, Error)]
pub enum AdminTaxonomyError {
    #[error("invalid value for `{0}`")]
    ConstraintViolation(&'static str),
    #[error("{} not found", .0.as_str())]
    NotFound(TaxonomyKind),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugFailure> for AdminTaxonomyError {
    fn from(failure: SlugFailure) -> Self {
        match failure {
            SlugFailure::Field(field) => AdminTaxonomyError::ConstraintViolation(field),
            SlugFailure::Repo(err) => AdminTaxonomyError::Repo(err),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyCommand {
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

/// Celebrations and relationships, selected per call by [`TaxonomyKind`].
#[derive(Clone)]
pub struct AdminTaxonomyService {
    reader: Arc<dyn TaxonomyRepo>,
    writer: Arc<dyn TaxonomyWriteRepo>,
    cache: Arc<StorefrontCache>,
}

impl AdminTaxonomyService {
    pub fn new(
        reader: Arc<dyn TaxonomyRepo>,
        writer: Arc<dyn TaxonomyWriteRepo>,
        cache: Arc<StorefrontCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyRecord>, AdminTaxonomyError> {
        self.reader
            .list_taxonomies(kind, ListScope::Admin)
            .await
            .map_err(AdminTaxonomyError::from)
    }

    pub async fn find(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
    ) -> Result<TaxonomyRecord, AdminTaxonomyError> {
        self.reader
            .find_taxonomy_by_id(kind, id)
            .await?
            .ok_or(AdminTaxonomyError::NotFound(kind))
    }

    pub async fn create(
        &self,
        kind: TaxonomyKind,
        command: TaxonomyCommand,
    ) -> Result<TaxonomyRecord, AdminTaxonomyError> {
        let name =
            required(&command.name, "name").map_err(AdminTaxonomyError::ConstraintViolation)?;

        let reader = self.reader.clone();
        let slug = slug_for_create(command.slug.as_deref(), &name, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_taxonomy_by_slug(kind, ListScope::Admin, &candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await?;

        let params = TaxonomyParams {
            slug,
            name,
            description: optional(command.description),
            image_url: optional(command.image_url),
            visible: command.visible,
            sort_order: command.sort_order,
        };

        let record = self.writer.create_taxonomy(kind, params).await?;
        self.written(kind, "create", record.id);
        Ok(record)
    }

    pub async fn update(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
        command: TaxonomyCommand,
    ) -> Result<TaxonomyRecord, AdminTaxonomyError> {
        let name =
            required(&command.name, "name").map_err(AdminTaxonomyError::ConstraintViolation)?;
        let existing = self.find(kind, id).await?;
        let slug = slug_for_update(command.slug.as_deref(), &existing.slug)?;

        let params = TaxonomyParams {
            slug,
            name,
            description: optional(command.description),
            image_url: optional(command.image_url),
            visible: command.visible,
            sort_order: command.sort_order,
        };

        let record = self.writer.update_taxonomy(kind, id, params).await?;
        self.written(kind, "update", id);
        Ok(record)
    }

    pub async fn delete(&self, kind: TaxonomyKind, id: Uuid) -> Result<(), AdminTaxonomyError> {
        self.writer.delete_taxonomy(kind, id).await?;
        self.written(kind, "delete", id);
        Ok(())
    }

    fn written(&self, kind: TaxonomyKind, action: &'static str, id: Uuid) {
        self.cache.invalidate_all();
        info!(
            target = "florette::admin",
            kind = kind.as_str(),
            action,
            %id,
            "taxonomy updated"
        );
    }
}
