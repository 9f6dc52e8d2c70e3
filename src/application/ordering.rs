//! WhatsApp ordering: turns a product pick into a prefilled chat link.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::application::repos::{RepoError, SettingsRepo};
use crate::application::storefront::{StorefrontError, StorefrontService};
use crate::domain::ordering::{
    MAX_QUANTITY, OrderMessage, find_banned_word, normalize_phone, whatsapp_link,
};

const MAX_NOTE_CHARS: usize = 500;
const DEFAULT_GREETING: &str = "Hello! I would like to order:";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),
    #[error("note contains a blocked word")]
    BannedWord { word: String },
    #[error("product not found")]
    ProductNotFound,
    #[error("whatsapp ordering is unavailable: {0}")]
    Unavailable(&'static str),
    #[error(transparent)]
    Storefront(StorefrontError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<StorefrontError> for OrderError {
    fn from(error: StorefrontError) -> Self {
        match error {
            StorefrontError::NotFound { .. } => OrderError::ProductNotFound,
            other => OrderError::Storefront(other),
        }
    }
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsappOrderCommand {
    pub product_slug: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatsappOrder {
    pub url: String,
    pub message: String,
}

#[derive(Clone)]
pub struct OrderingService {
    storefront: StorefrontService,
    settings: Arc<dyn SettingsRepo>,
}

impl OrderingService {
    pub fn new(storefront: StorefrontService, settings: Arc<dyn SettingsRepo>) -> Self {
        Self {
            storefront,
            settings,
        }
    }

    pub async fn whatsapp_order(
        &self,
        command: WhatsappOrderCommand,
    ) -> Result<WhatsappOrder, OrderError> {
        let slug = command.product_slug.trim();
        if slug.is_empty() {
            return Err(OrderError::Validation("product_slug is required".into()));
        }
        if command.quantity == 0 || command.quantity > MAX_QUANTITY {
            return Err(OrderError::Validation(format!(
                "quantity must be between 1 and {MAX_QUANTITY}"
            )));
        }

        let note = command
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty());
        if let Some(note) = note {
            if note.chars().count() > MAX_NOTE_CHARS {
                return Err(OrderError::Validation(format!(
                    "note must be at most {MAX_NOTE_CHARS} characters"
                )));
            }
            let banned = self.settings.list_banned_words().await?;
            if let Some(word) = find_banned_word(note, banned.iter().map(|b| b.word.as_str())) {
                return Err(OrderError::BannedWord { word });
            }
        }

        let settings = self.storefront.settings().await?;
        if !settings.whatsapp.enabled {
            return Err(OrderError::Unavailable("whatsapp ordering is disabled"));
        }
        let phone = settings
            .whatsapp
            .phone_number
            .as_deref()
            .ok_or(OrderError::Unavailable("no whatsapp number configured"))?;
        let phone = normalize_phone(phone)
            .map_err(|_| OrderError::Unavailable("configured whatsapp number is invalid"))?;

        let detail = self.storefront.product(slug).await?;
        if !detail.product.in_stock {
            return Err(OrderError::Validation(
                "product is currently out of stock".into(),
            ));
        }

        let greeting = match settings.whatsapp.greeting.trim() {
            "" => DEFAULT_GREETING,
            greeting => greeting,
        };
        let product_url = settings
            .public_site_url()
            .map(|base| format!("{base}/products/{}", detail.product.slug));

        let message = OrderMessage {
            greeting,
            product: &detail.product,
            quantity: command.quantity,
            product_url,
            note,
        }
        .render();
        let url = whatsapp_link(&phone, &message);

        info!(
            target = "florette::ordering",
            product = %detail.product.slug,
            quantity = command.quantity,
            "whatsapp order link issued"
        );

        Ok(WhatsappOrder { url, message })
    }
}
