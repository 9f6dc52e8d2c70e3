use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{RepoError, SettingsRepo, WhatsappSettingsParams};
use crate::application::storefront::StorefrontCache;
use crate::domain::entities::{BannedWordRecord, SiteSettingRecord, WhatsappSettingsRecord};
use crate::domain::ordering::normalize_phone;

const MAX_KEY_LEN: usize = 64;
const MAX_VALUE_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum AdminSettingsError {
    #[error("invalid value for `{0}`")]
    ConstraintViolation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettingCommand {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsappSettingsCommand {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub greeting: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannedWordCommand {
    pub word: String,
}

/// Site settings (theme values included), WhatsApp configuration and the
/// banned-word list.
#[derive(Clone)]
pub struct AdminSettingsService {
    repo: Arc<dyn SettingsRepo>,
    cache: Arc<StorefrontCache>,
}

impl AdminSettingsService {
    pub fn new(repo: Arc<dyn SettingsRepo>, cache: Arc<StorefrontCache>) -> Self {
        Self { repo, cache }
    }

    pub async fn list(&self) -> Result<Vec<SiteSettingRecord>, AdminSettingsError> {
        Ok(self.repo.list_site_settings().await?)
    }

    pub async fn upsert(
        &self,
        key: &str,
        command: SiteSettingCommand,
    ) -> Result<SiteSettingRecord, AdminSettingsError> {
        let key = normalize_key(key).ok_or(AdminSettingsError::ConstraintViolation("key"))?;
        let value = command.value.trim();
        if value.len() > MAX_VALUE_LEN {
            return Err(AdminSettingsError::ConstraintViolation("value"));
        }

        let record = self.repo.upsert_site_setting(&key, value).await?;
        self.written("setting.upsert", &key);
        Ok(record)
    }

    pub async fn delete(&self, key: &str) -> Result<(), AdminSettingsError> {
        let key = normalize_key(key).ok_or(AdminSettingsError::ConstraintViolation("key"))?;
        self.repo.delete_site_setting(&key).await?;
        self.written("setting.delete", &key);
        Ok(())
    }

    pub async fn whatsapp(&self) -> Result<WhatsappSettingsRecord, AdminSettingsError> {
        Ok(self.repo.load_whatsapp_settings().await?)
    }

    /// Phone numbers are stored as bare digits. Enabling requires a valid number.
    pub async fn update_whatsapp(
        &self,
        command: WhatsappSettingsCommand,
    ) -> Result<WhatsappSettingsRecord, AdminSettingsError> {
        let raw_phone = command.phone_number.trim();
        let phone_number = if raw_phone.is_empty() {
            if command.enabled {
                return Err(AdminSettingsError::ConstraintViolation("phone_number"));
            }
            String::new()
        } else {
            normalize_phone(raw_phone)
                .map_err(|_| AdminSettingsError::ConstraintViolation("phone_number"))?
        };

        let params = WhatsappSettingsParams {
            phone_number,
            greeting: command.greeting.trim().to_string(),
            enabled: command.enabled,
        };
        let record = self.repo.update_whatsapp_settings(params).await?;
        self.written("whatsapp.update", "whatsapp");
        Ok(record)
    }

    pub async fn banned_words(&self) -> Result<Vec<BannedWordRecord>, AdminSettingsError> {
        Ok(self.repo.list_banned_words().await?)
    }

    pub async fn add_banned_word(
        &self,
        command: BannedWordCommand,
    ) -> Result<BannedWordRecord, AdminSettingsError> {
        let word = normalize_word(&command.word)
            .ok_or(AdminSettingsError::ConstraintViolation("word"))?;
        let record = self.repo.create_banned_word(&word).await?;
        info!(target = "florette::admin", action = "banned_word.create", id = %record.id, "banned word added");
        Ok(record)
    }

    pub async fn remove_banned_word(&self, id: Uuid) -> Result<(), AdminSettingsError> {
        self.repo.delete_banned_word(id).await?;
        info!(target = "florette::admin", action = "banned_word.delete", %id, "banned word removed");
        Ok(())
    }

    fn written(&self, action: &'static str, key: &str) {
        self.cache.invalidate_all();
        info!(target = "florette::admin", action, key, "settings updated");
    }
}

/// Lower-cased key limited to `[a-z0-9._-]`, e.g. `theme.primary_color`.
fn normalize_key(raw: &str) -> Option<String> {
    let key = raw.trim().to_ascii_lowercase();
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
    valid.then_some(key)
}

fn normalize_word(raw: &str) -> Option<String> {
    let word = raw.trim().to_lowercase();
    (!word.is_empty() && !word.chars().any(char::is_whitespace)).then_some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercased_and_restricted() {
        assert_eq!(
            normalize_key(" Theme.Primary_Color ").as_deref(),
            Some("theme.primary_color")
        );
        assert_eq!(normalize_key("public_site_url").as_deref(), Some("public_site_url"));
        assert_eq!(normalize_key(""), None);
        assert_eq!(normalize_key("has space"), None);
        assert_eq!(normalize_key(&"k".repeat(MAX_KEY_LEN + 1)), None);
    }

    #[test]
    fn banned_words_are_single_lowercase_tokens() {
        assert_eq!(normalize_word("  Spam ").as_deref(), Some("spam"));
        assert_eq!(normalize_word("two words"), None);
        assert_eq!(normalize_word("   "), None);
    }
}
