//! Storefront reads: cached, visibility-filtered, with a built-in fallback catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::repos::{
    CatalogRepo, ContentRepo, ProductQueryFilter, RepoError, SettingsRepo, TaxonomyRepo,
};
use crate::cache::{CacheConfig, RequestCache};
use crate::domain::entities::{
    AnnouncementRecord, BannerRecord, CollectionRecord, FeaturedItemRecord, ProductRecord,
    RecordRef, ReviewVideoRecord, TaxonomyRecord, TestimonialRecord,
};
use crate::domain::fallback;
use crate::domain::types::{ListScope, TaxonomyKind};

/// Site setting holding the absolute storefront URL used in order links.
pub const PUBLIC_SITE_URL_KEY: &str = "public_site_url";
const THEME_PREFIX: &str = "theme.";

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(Arc<RepoError>),
}

impl From<RepoError> for StorefrontError {
    fn from(error: RepoError) -> Self {
        Self::Repo(Arc::new(error))
    }
}

impl From<Arc<RepoError>> for StorefrontError {
    fn from(error: Arc<RepoError>) -> Self {
        Self::Repo(error)
    }
}

/// A listing plus whether it came from the built-in fallback catalog.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Arc<Vec<T>>,
    pub fallback: bool,
}

impl<T> Listing<T> {
    fn stored(items: Arc<Vec<T>>) -> Self {
        Self {
            items,
            fallback: false,
        }
    }

    fn fallback(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub celebrations: Vec<RecordRef>,
    pub relationships: Vec<RecordRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: CollectionRecord,
    pub products: Arc<Vec<ProductRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyDetail {
    #[serde(flatten)]
    pub taxonomy: TaxonomyRecord,
    pub products: Arc<Vec<ProductRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub banners: Arc<Vec<BannerRecord>>,
    pub featured: Arc<Vec<FeaturedItemRecord>>,
    pub collections: Arc<Vec<CollectionRecord>>,
    pub testimonials: Arc<Vec<TestimonialRecord>>,
    pub announcements: Vec<AnnouncementRecord>,
    pub review_videos: Arc<Vec<ReviewVideoRecord>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicSettings {
    pub settings: BTreeMap<String, String>,
    /// `theme.*` settings with the prefix stripped.
    pub theme: BTreeMap<String, String>,
    pub whatsapp: PublicWhatsapp,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicWhatsapp {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub greeting: String,
}

impl PublicSettings {
    pub fn public_site_url(&self) -> Option<&str> {
        self.settings
            .get(PUBLIC_SITE_URL_KEY)
            .map(|value| value.trim().trim_end_matches('/'))
            .filter(|value| !value.is_empty())
    }
}

/// Every cache backing storefront reads. Admin writes drop all of them at once.
pub struct StorefrontCache {
    products: RequestCache<Arc<Vec<ProductRecord>>>,
    product: RequestCache<Option<ProductDetail>>,
    collections: RequestCache<Arc<Vec<CollectionRecord>>>,
    collection: RequestCache<Option<CollectionRecord>>,
    taxonomies: RequestCache<Arc<Vec<TaxonomyRecord>>>,
    taxonomy: RequestCache<Option<TaxonomyRecord>>,
    testimonials: RequestCache<Arc<Vec<TestimonialRecord>>>,
    banners: RequestCache<Arc<Vec<BannerRecord>>>,
    featured: RequestCache<Arc<Vec<FeaturedItemRecord>>>,
    announcements: RequestCache<Arc<Vec<AnnouncementRecord>>>,
    review_videos: RequestCache<Arc<Vec<ReviewVideoRecord>>>,
    settings: RequestCache<Arc<PublicSettings>>,
}

impl StorefrontCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            products: RequestCache::new("products", config),
            product: RequestCache::new("product", config),
            collections: RequestCache::new("collections", config),
            collection: RequestCache::new("collection", config),
            taxonomies: RequestCache::new("taxonomies", config),
            taxonomy: RequestCache::new("taxonomy", config),
            testimonials: RequestCache::new("testimonials", config),
            banners: RequestCache::new("banners", config),
            featured: RequestCache::new("featured", config),
            announcements: RequestCache::new("announcements", config),
            review_videos: RequestCache::new("review_videos", config),
            settings: RequestCache::new("settings", config),
        }
    }

    pub fn invalidate_all(&self) {
        self.products.invalidate_all();
        self.product.invalidate_all();
        self.collections.invalidate_all();
        self.collection.invalidate_all();
        self.taxonomies.invalidate_all();
        self.taxonomy.invalidate_all();
        self.testimonials.invalidate_all();
        self.banners.invalidate_all();
        self.featured.invalidate_all();
        self.announcements.invalidate_all();
        self.review_videos.invalidate_all();
        self.settings.invalidate_all();
        counter!("florette_request_cache_invalidate_total").increment(1);
        debug!(target = "florette::cache", "storefront caches invalidated");
    }
}

#[derive(Clone)]
pub struct StorefrontService {
    catalog: Arc<dyn CatalogRepo>,
    taxonomy: Arc<dyn TaxonomyRepo>,
    content: Arc<dyn ContentRepo>,
    settings: Arc<dyn SettingsRepo>,
    cache: Arc<StorefrontCache>,
}

impl StorefrontService {
    pub fn new(
        catalog: Arc<dyn CatalogRepo>,
        taxonomy: Arc<dyn TaxonomyRepo>,
        content: Arc<dyn ContentRepo>,
        settings: Arc<dyn SettingsRepo>,
        cache: Arc<StorefrontCache>,
    ) -> Self {
        Self {
            catalog,
            taxonomy,
            content,
            settings,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<StorefrontCache> {
        &self.cache
    }

    pub async fn products(
        &self,
        filter: &ProductQueryFilter,
    ) -> Result<Listing<ProductRecord>, StorefrontError> {
        let catalog = self.catalog.clone();
        let query = filter.clone();
        let result = self
            .cache
            .products
            .get_or_fetch(filter.cache_key(), || async move {
                catalog
                    .list_products(ListScope::Public, &query)
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(items) if !items.is_empty() => Ok(Listing::stored(items)),
            Ok(items) => match fallback_products(filter) {
                Some(fallback) => {
                    debug!(
                        target = "florette::storefront",
                        filter = %filter.cache_key(),
                        "no stored products; serving fallback catalog"
                    );
                    Ok(Listing::fallback(fallback))
                }
                None => Ok(Listing::stored(items)),
            },
            Err(err) => match fallback_products(filter) {
                Some(fallback) => {
                    warn!(
                        target = "florette::storefront",
                        error = %err,
                        "product listing failed; serving fallback catalog"
                    );
                    Ok(Listing::fallback(fallback))
                }
                None => Err(err.into()),
            },
        }
    }

    pub async fn product(&self, slug: &str) -> Result<ProductDetail, StorefrontError> {
        let catalog = self.catalog.clone();
        let key = slug.to_string();
        let stored = self
            .cache
            .product
            .get_or_fetch(slug, || async move {
                let Some(product) = catalog
                    .find_product_by_slug(ListScope::Public, &key)
                    .await?
                else {
                    return Ok(None);
                };
                let celebrations = catalog
                    .list_product_taxonomies(product.id, TaxonomyKind::Celebration)
                    .await?;
                let relationships = catalog
                    .list_product_taxonomies(product.id, TaxonomyKind::Relationship)
                    .await?;
                Ok::<_, RepoError>(Some(ProductDetail {
                    product,
                    celebrations,
                    relationships,
                }))
            })
            .await;

        match stored {
            Ok(Some(detail)) => Ok(detail),
            Ok(None) => {
                let listing = self.products(&ProductQueryFilter::default()).await?;
                find_fallback_product(&listing, slug)
                    .ok_or(StorefrontError::NotFound { entity: "product" })
            }
            Err(err) => {
                warn!(
                    target = "florette::storefront",
                    slug,
                    error = %err,
                    "product lookup failed; trying fallback catalog"
                );
                fallback::products()
                    .into_iter()
                    .find(|product| product.slug == slug)
                    .map(detail_without_links)
                    .ok_or_else(|| err.into())
            }
        }
    }

    pub async fn collections(&self) -> Result<Listing<CollectionRecord>, StorefrontError> {
        let catalog = self.catalog.clone();
        let result = self
            .cache
            .collections
            .get_or_fetch("public", || async move {
                catalog
                    .list_collections(ListScope::Public)
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(items) if !items.is_empty() => Ok(Listing::stored(items)),
            Ok(_) => Ok(Listing::fallback(fallback::collections())),
            Err(err) => {
                warn!(
                    target = "florette::storefront",
                    error = %err,
                    "collection listing failed; serving fallback catalog"
                );
                Ok(Listing::fallback(fallback::collections()))
            }
        }
    }

    pub async fn collection(&self, slug: &str) -> Result<CollectionDetail, StorefrontError> {
        let catalog = self.catalog.clone();
        let key = slug.to_string();
        let stored = self
            .cache
            .collection
            .get_or_fetch(slug, || async move {
                catalog
                    .find_collection_by_slug(ListScope::Public, &key)
                    .await
            })
            .await;

        let collection = match stored {
            Ok(Some(collection)) => collection,
            other => {
                if let Err(err) = &other {
                    warn!(
                        target = "florette::storefront",
                        slug,
                        error = %err,
                        "collection lookup failed; trying fallback catalog"
                    );
                }
                let listing = self.collections().await?;
                let found = listing
                    .items
                    .iter()
                    .find(|collection| collection.slug == slug)
                    .cloned();
                match found {
                    Some(collection) if listing.fallback => collection,
                    _ => {
                        return Err(match other {
                            Err(err) => err.into(),
                            _ => StorefrontError::NotFound {
                                entity: "collection",
                            },
                        });
                    }
                }
            }
        };

        let filter = ProductQueryFilter {
            collection: Some(collection.slug.clone()),
            ..Default::default()
        };
        let products = self.products(&filter).await?.items;

        Ok(CollectionDetail {
            collection,
            products,
        })
    }

    pub async fn taxonomies(
        &self,
        kind: TaxonomyKind,
    ) -> Result<Arc<Vec<TaxonomyRecord>>, StorefrontError> {
        let taxonomy = self.taxonomy.clone();
        self.cache
            .taxonomies
            .get_or_fetch(kind.as_str(), || async move {
                taxonomy
                    .list_taxonomies(kind, ListScope::Public)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(StorefrontError::from)
    }

    pub async fn taxonomy(
        &self,
        kind: TaxonomyKind,
        slug: &str,
    ) -> Result<TaxonomyDetail, StorefrontError> {
        let taxonomy = self.taxonomy.clone();
        let key = slug.to_string();
        let record = self
            .cache
            .taxonomy
            .get_or_fetch(format!("{}:{slug}", kind.as_str()), || async move {
                taxonomy
                    .find_taxonomy_by_slug(kind, ListScope::Public, &key)
                    .await
            })
            .await?
            .ok_or(StorefrontError::NotFound {
                entity: kind.as_str(),
            })?;

        let filter = match kind {
            TaxonomyKind::Celebration => ProductQueryFilter {
                celebration: Some(record.slug.clone()),
                ..Default::default()
            },
            TaxonomyKind::Relationship => ProductQueryFilter {
                relationship: Some(record.slug.clone()),
                ..Default::default()
            },
        };
        let products = self.products(&filter).await?.items;

        Ok(TaxonomyDetail {
            taxonomy: record,
            products,
        })
    }

    pub async fn testimonials(&self) -> Result<Listing<TestimonialRecord>, StorefrontError> {
        let content = self.content.clone();
        let result = self
            .cache
            .testimonials
            .get_or_fetch("public", || async move {
                content
                    .list_testimonials(ListScope::Public)
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(items) if !items.is_empty() => Ok(Listing::stored(items)),
            Ok(_) => Ok(Listing::fallback(fallback::testimonials())),
            Err(err) => {
                warn!(
                    target = "florette::storefront",
                    error = %err,
                    "testimonial listing failed; serving fallback testimonials"
                );
                Ok(Listing::fallback(fallback::testimonials()))
            }
        }
    }

    pub async fn banners(&self) -> Result<Arc<Vec<BannerRecord>>, StorefrontError> {
        let content = self.content.clone();
        self.cache
            .banners
            .get_or_fetch("public", || async move {
                content.list_banners(ListScope::Public).await.map(Arc::new)
            })
            .await
            .map_err(StorefrontError::from)
    }

    pub async fn featured(&self) -> Result<Arc<Vec<FeaturedItemRecord>>, StorefrontError> {
        let content = self.content.clone();
        self.cache
            .featured
            .get_or_fetch("public", || async move {
                content
                    .list_featured_items(ListScope::Public)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(StorefrontError::from)
    }

    /// Announcements whose schedule window contains the current instant.
    pub async fn announcements(&self) -> Result<Vec<AnnouncementRecord>, StorefrontError> {
        let content = self.content.clone();
        let now = OffsetDateTime::now_utc();
        let cached = self
            .cache
            .announcements
            .get_or_fetch("public", || async move {
                content
                    .list_announcements(ListScope::Public, now)
                    .await
                    .map(Arc::new)
            })
            .await?;

        // Entries may have ended since they were cached.
        let now = OffsetDateTime::now_utc();
        Ok(cached
            .iter()
            .filter(|announcement| announcement.is_active_at(now))
            .cloned()
            .collect())
    }

    pub async fn review_videos(&self) -> Result<Arc<Vec<ReviewVideoRecord>>, StorefrontError> {
        let content = self.content.clone();
        self.cache
            .review_videos
            .get_or_fetch("public", || async move {
                content
                    .list_review_videos(ListScope::Public)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(StorefrontError::from)
    }

    pub async fn settings(&self) -> Result<Arc<PublicSettings>, StorefrontError> {
        let settings = self.settings.clone();
        self.cache
            .settings
            .get_or_fetch("public", || async move {
                let records = settings.list_site_settings().await?;
                let whatsapp = settings.load_whatsapp_settings().await?;
                Ok::<_, RepoError>(Arc::new(build_public_settings(
                    records.into_iter().map(|record| (record.key, record.value)),
                    whatsapp.enabled,
                    whatsapp.phone_number,
                    whatsapp.greeting,
                )))
            })
            .await
            .map_err(StorefrontError::from)
    }

    /// Everything the landing page shows. Sections that fail to load are
    /// logged and rendered empty so one broken table does not blank the page.
    pub async fn home(&self) -> Result<HomeView, StorefrontError> {
        let (banners, featured, collections, testimonials, announcements, review_videos) = tokio::join!(
            self.banners(),
            self.featured(),
            self.collections(),
            self.testimonials(),
            self.announcements(),
            self.review_videos(),
        );

        Ok(HomeView {
            banners: degrade("banners", banners),
            featured: degrade("featured", featured),
            collections: collections?.items,
            testimonials: testimonials?.items,
            announcements: degrade("announcements", announcements),
            review_videos: degrade("review_videos", review_videos),
        })
    }
}

fn degrade<T: Default>(section: &'static str, result: Result<T, StorefrontError>) -> T {
    result.unwrap_or_else(|err| {
        warn!(
            target = "florette::storefront",
            section,
            error = %err,
            "home section unavailable"
        );
        T::default()
    })
}

/// Fallback products for a filter, or `None` when the filter cannot be
/// answered from the fallback catalog.
fn fallback_products(filter: &ProductQueryFilter) -> Option<Vec<ProductRecord>> {
    if filter.celebration.is_some() || filter.relationship.is_some() || filter.search.is_some() {
        return None;
    }
    match filter.collection.as_deref() {
        Some(slug) => {
            let products = fallback::products_in_collection(slug);
            (!products.is_empty()).then_some(products)
        }
        None => Some(fallback::products()),
    }
}

fn find_fallback_product(listing: &Listing<ProductRecord>, slug: &str) -> Option<ProductDetail> {
    if !listing.fallback {
        return None;
    }
    listing
        .items
        .iter()
        .find(|product| product.slug == slug)
        .cloned()
        .map(detail_without_links)
}

fn detail_without_links(product: ProductRecord) -> ProductDetail {
    ProductDetail {
        product,
        celebrations: Vec::new(),
        relationships: Vec::new(),
    }
}

fn build_public_settings(
    entries: impl IntoIterator<Item = (String, String)>,
    whatsapp_enabled: bool,
    phone_number: String,
    greeting: String,
) -> PublicSettings {
    let mut settings = BTreeMap::new();
    let mut theme = BTreeMap::new();
    for (key, value) in entries {
        if let Some(name) = key.strip_prefix(THEME_PREFIX) {
            theme.insert(name.to_string(), value.clone());
        }
        settings.insert(key, value);
    }

    let phone_number = phone_number.trim().to_string();
    let enabled = whatsapp_enabled && !phone_number.is_empty();

    PublicSettings {
        settings,
        theme,
        whatsapp: PublicWhatsapp {
            enabled,
            phone_number: enabled.then_some(phone_number),
            greeting,
        },
    }
}
