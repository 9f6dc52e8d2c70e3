//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    AdminSessionRecord, AnnouncementRecord, BannedWordRecord, BannerRecord, CollectionRecord,
    FeaturedItemRecord, ProductRecord, RecordRef, ReviewVideoRecord, SiteSettingRecord,
    TaxonomyRecord, TestimonialRecord, WhatsappSettingsRecord,
};
use crate::domain::types::{ListScope, TaxonomyKind};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Storefront product filters. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQueryFilter {
    /// Collection slug.
    pub collection: Option<String>,
    /// Celebration slug.
    pub celebration: Option<String>,
    /// Relationship slug.
    pub relationship: Option<String>,
    /// Case-insensitive match against name, slug and description.
    pub search: Option<String>,
}

impl ProductQueryFilter {
    pub fn is_empty(&self) -> bool {
        self.collection.is_none()
            && self.celebration.is_none()
            && self.relationship.is_none()
            && self.search.is_none()
    }

    /// Stable textual form used as a cache key.
    pub fn cache_key(&self) -> String {
        format!(
            "c={}&e={}&r={}&q={}",
            self.collection.as_deref().unwrap_or_default(),
            self.celebration.as_deref().unwrap_or_default(),
            self.relationship.as_deref().unwrap_or_default(),
            self.search.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct CollectionParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct ProductParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub compare_at_price_cents: Option<i64>,
    pub currency: String,
    pub images: Vec<String>,
    pub collection_id: Option<Uuid>,
    pub in_stock: bool,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct TaxonomyParams {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct TestimonialParams {
    pub author_name: String,
    pub author_title: Option<String>,
    pub quote: String,
    pub rating: i16,
    pub avatar_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct BannerParams {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct FeaturedItemParams {
    pub product_id: Uuid,
    pub label: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct AnnouncementParams {
    pub message: String,
    pub link_url: Option<String>,
    pub starts_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct ReviewVideoParams {
    pub title: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub visible: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct WhatsappSettingsParams {
    pub phone_number: String,
    pub greeting: String,
    pub enabled: bool,
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn list_collections(&self, scope: ListScope)
    -> Result<Vec<CollectionRecord>, RepoError>;

    async fn find_collection_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<CollectionRecord>, RepoError>;

    async fn find_collection_by_id(&self, id: Uuid)
    -> Result<Option<CollectionRecord>, RepoError>;

    async fn list_products(
        &self,
        scope: ListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn find_product_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<ProductRecord>, RepoError>;

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError>;

    /// Celebrations or relationships linked to a product, in display order.
    async fn list_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
    ) -> Result<Vec<RecordRef>, RepoError>;
}

#[async_trait]
pub trait CatalogWriteRepo: Send + Sync {
    async fn create_collection(
        &self,
        params: CollectionParams,
    ) -> Result<CollectionRecord, RepoError>;

    async fn update_collection(
        &self,
        id: Uuid,
        params: CollectionParams,
    ) -> Result<CollectionRecord, RepoError>;

    async fn delete_collection(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_product(&self, params: ProductParams) -> Result<ProductRecord, RepoError>;

    async fn update_product(
        &self,
        id: Uuid,
        params: ProductParams,
    ) -> Result<ProductRecord, RepoError>;

    async fn set_product_visibility(
        &self,
        id: Uuid,
        visible: bool,
    ) -> Result<ProductRecord, RepoError>;

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError>;

    /// Replace every link between a product and one taxonomy in a single transaction.
    async fn replace_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
        taxonomy_ids: &[Uuid],
    ) -> Result<Vec<RecordRef>, RepoError>;
}

#[async_trait]
pub trait TaxonomyRepo: Send + Sync {
    async fn list_taxonomies(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
    ) -> Result<Vec<TaxonomyRecord>, RepoError>;

    async fn find_taxonomy_by_slug(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError>;

    async fn find_taxonomy_by_id(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
    ) -> Result<Option<TaxonomyRecord>, RepoError>;
}

#[async_trait]
pub trait TaxonomyWriteRepo: Send + Sync {
    async fn create_taxonomy(
        &self,
        kind: TaxonomyKind,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError>;

    async fn update_taxonomy(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError>;

    async fn delete_taxonomy(&self, kind: TaxonomyKind, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn list_testimonials(
        &self,
        scope: ListScope,
    ) -> Result<Vec<TestimonialRecord>, RepoError>;

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError>;

    async fn list_banners(&self, scope: ListScope) -> Result<Vec<BannerRecord>, RepoError>;

    async fn find_banner(&self, id: Uuid) -> Result<Option<BannerRecord>, RepoError>;

    /// Public scope also drops items whose product is hidden.
    async fn list_featured_items(
        &self,
        scope: ListScope,
    ) -> Result<Vec<FeaturedItemRecord>, RepoError>;

    async fn find_featured_item(&self, id: Uuid)
    -> Result<Option<FeaturedItemRecord>, RepoError>;

    /// Public scope also drops announcements whose schedule window excludes `now`.
    async fn list_announcements(
        &self,
        scope: ListScope,
        now: OffsetDateTime,
    ) -> Result<Vec<AnnouncementRecord>, RepoError>;

    async fn find_announcement(&self, id: Uuid)
    -> Result<Option<AnnouncementRecord>, RepoError>;

    async fn list_review_videos(
        &self,
        scope: ListScope,
    ) -> Result<Vec<ReviewVideoRecord>, RepoError>;

    async fn find_review_video(&self, id: Uuid) -> Result<Option<ReviewVideoRecord>, RepoError>;
}

#[async_trait]
pub trait ContentWriteRepo: Send + Sync {
    async fn create_testimonial(
        &self,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError>;
    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError>;
    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_banner(&self, params: BannerParams) -> Result<BannerRecord, RepoError>;
    async fn update_banner(
        &self,
        id: Uuid,
        params: BannerParams,
    ) -> Result<BannerRecord, RepoError>;
    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_featured_item(
        &self,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError>;
    async fn update_featured_item(
        &self,
        id: Uuid,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError>;
    async fn delete_featured_item(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_announcement(
        &self,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError>;
    async fn update_announcement(
        &self,
        id: Uuid,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError>;
    async fn delete_announcement(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_review_video(
        &self,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError>;
    async fn update_review_video(
        &self,
        id: Uuid,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError>;
    async fn delete_review_video(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn list_site_settings(&self) -> Result<Vec<SiteSettingRecord>, RepoError>;

    async fn upsert_site_setting(
        &self,
        key: &str,
        value: &str,
    ) -> Result<SiteSettingRecord, RepoError>;

    async fn delete_site_setting(&self, key: &str) -> Result<(), RepoError>;

    async fn load_whatsapp_settings(&self) -> Result<WhatsappSettingsRecord, RepoError>;

    async fn update_whatsapp_settings(
        &self,
        params: WhatsappSettingsParams,
    ) -> Result<WhatsappSettingsRecord, RepoError>;

    async fn list_banned_words(&self) -> Result<Vec<BannedWordRecord>, RepoError>;

    async fn create_banned_word(&self, word: &str) -> Result<BannedWordRecord, RepoError>;

    async fn delete_banned_word(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(
        &self,
        token_hash: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<AdminSessionRecord, RepoError>;

    /// Look up a session by token digest, ignoring sessions expired at `now`.
    async fn find_active_session(
        &self,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<Option<AdminSessionRecord>, RepoError>;

    async fn touch_session(&self, id: Uuid, now: OffsetDateTime) -> Result<(), RepoError>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError>;

    /// Delete every session expired at `now`, returning how many were removed.
    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
