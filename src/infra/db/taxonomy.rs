use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, TaxonomyParams, TaxonomyRepo, TaxonomyWriteRepo},
    domain::entities::TaxonomyRecord,
    domain::types::{ListScope, TaxonomyKind},
};

use super::{PostgresRepositories, map_sqlx_error};

const TAXONOMY_COLUMNS: &str =
    "id, slug, name, description, image_url, visible, sort_order, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TaxonomyRow {
    id: Uuid,
    slug: String,
    name: String,
    description: Option<String>,
    image_url: Option<String>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TaxonomyRow {
    fn into_record(self, kind: TaxonomyKind) -> TaxonomyRecord {
        TaxonomyRecord {
            id: self.id,
            kind,
            slug: self.slug,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            visible: self.visible,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl TaxonomyRepo for PostgresRepositories {
    async fn list_taxonomies(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
    ) -> Result<Vec<TaxonomyRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {TAXONOMY_COLUMNS} FROM {table} t WHERE 1=1 ",
            table = kind.table()
        ));
        Self::apply_scope(&mut qb, scope, "t");
        qb.push(" ORDER BY t.sort_order ASC, t.name ASC");

        let rows = qb
            .build_query_as::<TaxonomyRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|row| row.into_record(kind)).collect())
    }

    async fn find_taxonomy_by_slug(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {TAXONOMY_COLUMNS} FROM {table} t WHERE t.slug = ",
            table = kind.table()
        ));
        qb.push_bind(slug);
        Self::apply_scope(&mut qb, scope, "t");

        let row = qb
            .build_query_as::<TaxonomyRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|row| row.into_record(kind)))
    }

    async fn find_taxonomy_by_id(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
            "SELECT {TAXONOMY_COLUMNS} FROM {table} WHERE id = $1",
            table = kind.table()
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| row.into_record(kind)))
    }
}

#[async_trait]
impl TaxonomyWriteRepo for PostgresRepositories {
    async fn create_taxonomy(
        &self,
        kind: TaxonomyKind,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let TaxonomyParams {
            slug,
            name,
            description,
            image_url,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
            "INSERT INTO {table} (id, slug, name, description, image_url, visible, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {TAXONOMY_COLUMNS}",
            table = kind.table()
        ))
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(image_url)
        .bind(visible)
        .bind(sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into_record(kind))
    }

    async fn update_taxonomy(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let TaxonomyParams {
            slug,
            name,
            description,
            image_url,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, TaxonomyRow>(&format!(
            "UPDATE {table} \
             SET slug = $2, name = $3, description = $4, image_url = $5, visible = $6, \
                 sort_order = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {TAXONOMY_COLUMNS}",
            table = kind.table()
        ))
        .bind(id)
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(image_url)
        .bind(visible)
        .bind(sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into_record(kind))
    }

    async fn delete_taxonomy(&self, kind: TaxonomyKind, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE id = $1",
            table = kind.table()
        ))
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Self::expect_affected(result)
    }
}
