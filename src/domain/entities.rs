//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::TaxonomyKind;

/// Resolved pointer to another record, joined at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub compare_at_price_cents: Option<i64>,
    pub currency: String,
    /// Ordered gallery; the first entry is the cover image.
    pub images: Vec<String>,
    pub collection: Option<RecordRef>,
    pub in_stock: bool,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProductRecord {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn is_discounted(&self) -> bool {
        self.compare_at_price_cents
            .is_some_and(|compare| compare > self.price_cents)
    }
}

/// Celebrations and relationships share one shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyRecord {
    pub id: Uuid,
    pub kind: TaxonomyKind,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestimonialRecord {
    pub id: Uuid,
    pub author_name: String,
    pub author_title: Option<String>,
    pub quote: String,
    pub rating: i16,
    pub avatar_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerRecord {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedItemRecord {
    pub id: Uuid,
    pub product: RecordRef,
    pub label: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnouncementRecord {
    pub id: Uuid,
    pub message: String,
    pub link_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AnnouncementRecord {
    /// Whether the announcement's schedule window contains `now`.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        let started = self.starts_at.is_none_or(|starts| starts <= now);
        let not_ended = self.ends_at.is_none_or(|ends| now < ends);
        started && not_ended
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewVideoRecord {
    pub id: Uuid,
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSettingRecord {
    pub key: String,
    pub value: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannedWordRecord {
    pub id: Uuid,
    pub word: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhatsappSettingsRecord {
    pub phone_number: String,
    pub greeting: String,
    pub enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSessionRecord {
    pub id: Uuid,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub last_seen_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn announcement(
        starts_at: Option<OffsetDateTime>,
        ends_at: Option<OffsetDateTime>,
    ) -> AnnouncementRecord {
        let now = OffsetDateTime::now_utc();
        AnnouncementRecord {
            id: Uuid::new_v4(),
            message: "Free delivery this weekend".to_string(),
            link_url: None,
            starts_at,
            ends_at,
            visible: true,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unbounded_announcement_is_always_active() {
        let record = announcement(None, None);
        assert!(record.is_active_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn announcement_window_is_half_open() {
        let now = OffsetDateTime::now_utc();
        let record = announcement(Some(now - Duration::hours(1)), Some(now));
        assert!(record.is_active_at(now - Duration::minutes(1)));
        assert!(!record.is_active_at(now));
        assert!(!record.is_active_at(now - Duration::hours(2)));
    }
}
