use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, SettingsRepo, WhatsappSettingsParams},
    domain::entities::{BannedWordRecord, SiteSettingRecord, WhatsappSettingsRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SiteSettingRow {
    key: String,
    value: String,
    updated_at: OffsetDateTime,
}

impl From<SiteSettingRow> for SiteSettingRecord {
    fn from(row: SiteSettingRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WhatsappSettingsRow {
    phone_number: String,
    greeting: String,
    enabled: bool,
    updated_at: OffsetDateTime,
}

impl From<WhatsappSettingsRow> for WhatsappSettingsRecord {
    fn from(row: WhatsappSettingsRow) -> Self {
        Self {
            phone_number: row.phone_number,
            greeting: row.greeting,
            enabled: row.enabled,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BannedWordRow {
    id: Uuid,
    word: String,
    created_at: OffsetDateTime,
}

impl From<BannedWordRow> for BannedWordRecord {
    fn from(row: BannedWordRow) -> Self {
        Self {
            id: row.id,
            word: row.word,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SettingsRepo for PostgresRepositories {
    async fn list_site_settings(&self) -> Result<Vec<SiteSettingRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SiteSettingRow>(
            "SELECT key, value, updated_at FROM site_settings ORDER BY key ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SiteSettingRecord::from).collect())
    }

    async fn upsert_site_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Result<SiteSettingRecord, RepoError> {
        let row = sqlx::query_as::<_, SiteSettingRow>(
            r#"
            INSERT INTO site_settings (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SiteSettingRecord::from(row))
    }

    async fn delete_site_setting(&self, key: &str) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM site_settings WHERE key = $1")
            .bind(key)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::expect_affected(result)
    }

    async fn load_whatsapp_settings(&self) -> Result<WhatsappSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, WhatsappSettingsRow>(
            "SELECT phone_number, greeting, enabled, updated_at FROM whatsapp_settings WHERE id",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(WhatsappSettingsRecord::from(row))
    }

    async fn update_whatsapp_settings(
        &self,
        params: WhatsappSettingsParams,
    ) -> Result<WhatsappSettingsRecord, RepoError> {
        let row = sqlx::query_as::<_, WhatsappSettingsRow>(
            r#"
            INSERT INTO whatsapp_settings (id, phone_number, greeting, enabled, updated_at)
            VALUES (TRUE, $1, $2, $3, now())
            ON CONFLICT (id) DO UPDATE
            SET phone_number = EXCLUDED.phone_number,
                greeting = EXCLUDED.greeting,
                enabled = EXCLUDED.enabled,
                updated_at = EXCLUDED.updated_at
            RETURNING phone_number, greeting, enabled, updated_at
            "#,
        )
        .bind(params.phone_number)
        .bind(params.greeting)
        .bind(params.enabled)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(WhatsappSettingsRecord::from(row))
    }

    async fn list_banned_words(&self) -> Result<Vec<BannedWordRecord>, RepoError> {
        let rows = sqlx::query_as::<_, BannedWordRow>(
            "SELECT id, word, created_at FROM banned_words ORDER BY word ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BannedWordRecord::from).collect())
    }

    async fn create_banned_word(&self, word: &str) -> Result<BannedWordRecord, RepoError> {
        let row = sqlx::query_as::<_, BannedWordRow>(
            r#"
            INSERT INTO banned_words (id, word, created_at)
            VALUES ($1, $2, now())
            RETURNING id, word, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(word)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BannedWordRecord::from(row))
    }

    async fn delete_banned_word(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("banned_words", id).await
    }
}
