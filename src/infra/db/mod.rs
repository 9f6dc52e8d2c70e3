//! Postgres-backed repository implementations.

mod catalog;
mod content;
mod sessions;
mod settings;
mod taxonomy;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions, PgQueryResult},
    query,
};
use uuid::Uuid;

use crate::application::repos::{HealthRepo, RepoError};
use crate::domain::entities::RecordRef;
use crate::domain::types::ListScope;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Restrict a listing to visible rows of `alias` for storefront reads.
    fn apply_scope<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: ListScope, alias: &str) {
        if scope.is_public() {
            qb.push(format!(" AND {alias}.visible "));
        }
    }

    async fn delete_by_id(&self, table: &'static str, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::expect_affected(result)
    }

    /// Deletes and updates by id report a missing row as `NotFound`.
    fn expect_affected(result: PgQueryResult) -> Result<(), RepoError> {
        if result.rows_affected() == 0 {
            Err(RepoError::NotFound)
        } else {
            Ok(())
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefRow {
    id: Uuid,
    slug: String,
    name: String,
}

impl From<RefRow> for RecordRef {
    fn from(row: RefRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
        }
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
