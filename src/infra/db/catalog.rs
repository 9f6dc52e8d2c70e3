use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CatalogRepo, CatalogWriteRepo, CollectionParams, ProductParams, ProductQueryFilter,
        RepoError,
    },
    domain::entities::{CollectionRecord, ProductRecord, RecordRef},
    domain::types::{ListScope, TaxonomyKind},
};

use super::util::contains_pattern;
use super::{PostgresRepositories, RefRow, map_sqlx_error};

const COLLECTION_COLUMNS: &str =
    "id, slug, name, description, image_url, visible, sort_order, created_at, updated_at";

const PRODUCT_SELECT: &str = "p.id, p.slug, p.name, p.description, p.price_cents, \
    p.compare_at_price_cents, p.currency, p.images, p.in_stock, p.visible, p.sort_order, \
    p.created_at, p.updated_at, \
    c.id AS collection_id, c.slug AS collection_slug, c.name AS collection_name";

#[derive(sqlx::FromRow)]
struct CollectionRow {
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

impl From<CollectionRow> for CollectionRecord {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            image_url: row.image_url,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    slug: String,
    name: String,
    description: Option<String>,
    price_cents: i64,
    compare_at_price_cents: Option<i64>,
    currency: String,
    images: Vec<String>,
    in_stock: bool,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    collection_id: Option<Uuid>,
    collection_slug: Option<String>,
    collection_name: Option<String>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        let collection = match (row.collection_id, row.collection_slug, row.collection_name) {
            (Some(id), Some(slug), Some(name)) => Some(RecordRef { id, slug, name }),
            _ => None,
        };

        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            compare_at_price_cents: row.compare_at_price_cents,
            currency: row.currency,
            images: row.images,
            collection,
            in_stock: row.in_stock,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn product_query<'q>(scope: ListScope) -> QueryBuilder<'q, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {PRODUCT_SELECT} FROM products p \
             LEFT JOIN collections c ON c.id = p.collection_id WHERE 1=1 "
        ));
        if scope.is_public() {
            qb.push(" AND p.visible AND (c.id IS NULL OR c.visible) ");
        }
        qb
    }

    fn apply_product_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        scope: ListScope,
        filter: &'q ProductQueryFilter,
    ) {
        if let Some(collection) = filter.collection.as_ref() {
            qb.push(" AND c.slug = ");
            qb.push_bind(collection);
        }

        for (kind, slug) in [
            (TaxonomyKind::Celebration, filter.celebration.as_ref()),
            (TaxonomyKind::Relationship, filter.relationship.as_ref()),
        ] {
            let Some(slug) = slug else { continue };
            qb.push(format!(
                " AND EXISTS (SELECT 1 FROM {link} l INNER JOIN {table} t ON t.id = l.{column} \
                 WHERE l.product_id = p.id AND t.slug = ",
                link = kind.link_table(),
                table = kind.table(),
                column = kind.link_column(),
            ));
            qb.push_bind(slug);
            if scope.is_public() {
                qb.push(" AND t.visible");
            }
            qb.push(")");
        }

        if let Some(search) = filter.search.as_ref() {
            let pattern = contains_pattern(search);
            qb.push(" AND (p.name ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.slug ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.description ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    async fn fetch_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let mut qb = Self::product_query(ListScope::Admin);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<ProductRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }
}

#[async_trait]
impl CatalogRepo for PostgresRepositories {
    async fn list_collections(
        &self,
        scope: ListScope,
    ) -> Result<Vec<CollectionRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections c WHERE 1=1 "
        ));
        Self::apply_scope(&mut qb, scope, "c");
        qb.push(" ORDER BY c.sort_order ASC, c.name ASC");

        let rows = qb
            .build_query_as::<CollectionRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CollectionRecord::from).collect())
    }

    async fn find_collection_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<CollectionRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections c WHERE c.slug = "
        ));
        qb.push_bind(slug);
        Self::apply_scope(&mut qb, scope, "c");

        let row = qb
            .build_query_as::<CollectionRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CollectionRecord::from))
    }

    async fn find_collection_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<CollectionRecord>, RepoError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CollectionRecord::from))
    }

    async fn list_products(
        &self,
        scope: ListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let mut qb = Self::product_query(scope);
        Self::apply_product_filter(&mut qb, scope, filter);
        qb.push(" ORDER BY p.sort_order ASC, p.name ASC");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn find_product_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<ProductRecord>, RepoError> {
        let mut qb = Self::product_query(scope);
        qb.push(" AND p.slug = ");
        qb.push_bind(slug);

        let row = qb
            .build_query_as::<ProductRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        self.fetch_product_by_id(id).await
    }

    async fn list_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
    ) -> Result<Vec<RecordRef>, RepoError> {
        let sql = format!(
            "SELECT t.id, t.slug, t.name FROM {table} t \
             INNER JOIN {link} l ON l.{column} = t.id \
             WHERE l.product_id = $1 \
             ORDER BY t.sort_order ASC, t.name ASC",
            table = kind.table(),
            link = kind.link_table(),
            column = kind.link_column(),
        );

        let rows = sqlx::query_as::<_, RefRow>(&sql)
            .bind(product_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecordRef::from).collect())
    }
}

#[async_trait]
impl CatalogWriteRepo for PostgresRepositories {
    async fn create_collection(
        &self,
        params: CollectionParams,
    ) -> Result<CollectionRecord, RepoError> {
        let CollectionParams {
            slug,
            name,
            description,
            image_url,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "INSERT INTO collections (id, slug, name, description, image_url, visible, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {COLLECTION_COLUMNS}"
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

        Ok(CollectionRecord::from(row))
    }

    async fn update_collection(
        &self,
        id: Uuid,
        params: CollectionParams,
    ) -> Result<CollectionRecord, RepoError> {
        let CollectionParams {
            slug,
            name,
            description,
            image_url,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "UPDATE collections \
             SET slug = $2, name = $3, description = $4, image_url = $5, visible = $6, \
                 sort_order = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLLECTION_COLUMNS}"
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

        Ok(CollectionRecord::from(row))
    }

    async fn delete_collection(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::expect_affected(result)
    }

    async fn create_product(&self, params: ProductParams) -> Result<ProductRecord, RepoError> {
        let ProductParams {
            slug,
            name,
            description,
            price_cents,
            compare_at_price_cents,
            currency,
            images,
            collection_id,
            in_stock,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "WITH p AS ( \
                 INSERT INTO products (id, slug, name, description, price_cents, \
                     compare_at_price_cents, currency, images, collection_id, in_stock, \
                     visible, sort_order, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13) \
                 RETURNING * \
             ) \
             SELECT {PRODUCT_SELECT} FROM p LEFT JOIN collections c ON c.id = p.collection_id"
        ))
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(price_cents)
        .bind(compare_at_price_cents)
        .bind(currency)
        .bind(images)
        .bind(collection_id)
        .bind(in_stock)
        .bind(visible)
        .bind(sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductRecord::from(row))
    }

    async fn update_product(
        &self,
        id: Uuid,
        params: ProductParams,
    ) -> Result<ProductRecord, RepoError> {
        let ProductParams {
            slug,
            name,
            description,
            price_cents,
            compare_at_price_cents,
            currency,
            images,
            collection_id,
            in_stock,
            visible,
            sort_order,
        } = params;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "WITH p AS ( \
                 UPDATE products \
                 SET slug = $2, name = $3, description = $4, price_cents = $5, \
                     compare_at_price_cents = $6, currency = $7, images = $8, \
                     collection_id = $9, in_stock = $10, visible = $11, sort_order = $12, \
                     updated_at = now() \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {PRODUCT_SELECT} FROM p LEFT JOIN collections c ON c.id = p.collection_id"
        ))
        .bind(id)
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(price_cents)
        .bind(compare_at_price_cents)
        .bind(currency)
        .bind(images)
        .bind(collection_id)
        .bind(in_stock)
        .bind(visible)
        .bind(sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductRecord::from(row))
    }

    async fn set_product_visibility(
        &self,
        id: Uuid,
        visible: bool,
    ) -> Result<ProductRecord, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "WITH p AS ( \
                 UPDATE products SET visible = $2, updated_at = now() \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {PRODUCT_SELECT} FROM p LEFT JOIN collections c ON c.id = p.collection_id"
        ))
        .bind(id)
        .bind(visible)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductRecord::from(row))
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::expect_affected(result)
    }

    async fn replace_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
        taxonomy_ids: &[Uuid],
    ) -> Result<Vec<RecordRef>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        sqlx::query(&format!(
            "DELETE FROM {link} WHERE product_id = $1",
            link = kind.link_table()
        ))
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if !taxonomy_ids.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO {link} (product_id, {column}) ",
                link = kind.link_table(),
                column = kind.link_column(),
            ));
            qb.push_values(taxonomy_ids, |mut row, taxonomy_id| {
                row.push_bind(product_id).push_bind(*taxonomy_id);
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let rows = sqlx::query_as::<_, RefRow>(&format!(
            "SELECT t.id, t.slug, t.name FROM {table} t \
             INNER JOIN {link} l ON l.{column} = t.id \
             WHERE l.product_id = $1 \
             ORDER BY t.sort_order ASC, t.name ASC",
            table = kind.table(),
            link = kind.link_table(),
            column = kind.link_column(),
        ))
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(RecordRef::from).collect())
    }
}
