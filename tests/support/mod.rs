#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use florette::application::admin::{
    AdminCatalogService, AdminContentService, AdminSettingsService, AdminTaxonomyService,
};
use florette::application::auth::AdminAuthService;
use florette::application::ordering::OrderingService;
use florette::application::repos::{
    AnnouncementParams, BannerParams, CatalogRepo, CatalogWriteRepo, CollectionParams,
    ContentRepo, ContentWriteRepo, FeaturedItemParams, HealthRepo, ProductParams,
    ProductQueryFilter, RepoError, ReviewVideoParams, SessionsRepo, SettingsRepo,
    TaxonomyParams, TaxonomyRepo, TaxonomyWriteRepo, TestimonialParams, WhatsappSettingsParams,
};
use florette::application::storefront::{StorefrontCache, StorefrontService};
use florette::application::uploads::{UploadPublisher, UploadService};
use florette::cache::CacheConfig;
use florette::domain::entities::{
    AdminSessionRecord, AnnouncementRecord, BannedWordRecord, BannerRecord, CollectionRecord,
    FeaturedItemRecord, ProductRecord, RecordRef, ReviewVideoRecord, SiteSettingRecord,
    TaxonomyRecord, TestimonialRecord, WhatsappSettingsRecord,
};
use florette::domain::types::{ListScope, TaxonomyKind};
use florette::infra::http::{
    AdminState, LoginRateLimiter, PublicState, SESSION_COOKIE, build_admin_router,
    build_public_router,
};
use florette::infra::uploads::UploadStorage;

pub const ADMIN_PASSWORD: &str = "peonies-in-june";

#[derive(Default)]
struct State {
    collections: Vec<CollectionRecord>,
    products: Vec<ProductRecord>,
    taxonomies: Vec<TaxonomyRecord>,
    links: Vec<(Uuid, TaxonomyKind, Uuid)>,
    testimonials: Vec<TestimonialRecord>,
    banners: Vec<BannerRecord>,
    featured: Vec<FeaturedItemRecord>,
    announcements: Vec<AnnouncementRecord>,
    review_videos: Vec<ReviewVideoRecord>,
    settings: BTreeMap<String, SiteSettingRecord>,
    whatsapp: Option<WhatsappSettingsRecord>,
    banned: Vec<BannedWordRecord>,
    sessions: Vec<AdminSessionRecord>,
}

/// Every repository trait over one in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    product_list_calls: AtomicUsize,
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn visible_for(scope: ListScope, visible: bool) -> bool {
    !scope.is_public() || visible
}

fn slugged(name: &str) -> String {
    slug::slugify(name)
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn product_list_calls(&self) -> usize {
        self.product_list_calls.load(Ordering::SeqCst)
    }

    pub async fn seed_collection(&self, name: &str, visible: bool) -> CollectionRecord {
        let record = CollectionRecord {
            id: Uuid::new_v4(),
            slug: slugged(name),
            name: name.to_string(),
            description: None,
            image_url: None,
            visible,
            sort_order: 0,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.collections.push(record.clone());
        record
    }

    pub async fn seed_product(
        &self,
        name: &str,
        collection: Option<&CollectionRecord>,
        visible: bool,
    ) -> ProductRecord {
        let record = ProductRecord {
            id: Uuid::new_v4(),
            slug: slugged(name),
            name: name.to_string(),
            description: Some(format!("{name} hand-tied by our florists")),
            price_cents: 350_000_00,
            compare_at_price_cents: None,
            currency: "IDR".to_string(),
            images: vec![format!("/uploads/products/{}.jpg", slugged(name))],
            collection: collection.map(|c| RecordRef {
                id: c.id,
                slug: c.slug.clone(),
                name: c.name.clone(),
            }),
            in_stock: true,
            visible,
            sort_order: 0,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.products.push(record.clone());
        record
    }

    pub async fn seed_taxonomy(&self, kind: TaxonomyKind, name: &str, visible: bool) -> TaxonomyRecord {
        let record = TaxonomyRecord {
            id: Uuid::new_v4(),
            kind,
            slug: slugged(name),
            name: name.to_string(),
            description: None,
            image_url: None,
            visible,
            sort_order: 0,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.taxonomies.push(record.clone());
        record
    }

    pub async fn link(&self, product: &ProductRecord, taxonomy: &TaxonomyRecord) {
        self.state
            .lock()
            .await
            .links
            .push((product.id, taxonomy.kind, taxonomy.id));
    }

    pub async fn seed_testimonial(&self, author: &str, visible: bool) -> TestimonialRecord {
        let record = TestimonialRecord {
            id: Uuid::new_v4(),
            author_name: author.to_string(),
            author_title: None,
            quote: "The arrangement arrived fresh and right on time.".to_string(),
            rating: 5,
            avatar_url: None,
            visible,
            sort_order: 0,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.testimonials.push(record.clone());
        record
    }

    pub async fn set_whatsapp(&self, phone: &str, enabled: bool) {
        self.state.lock().await.whatsapp = Some(WhatsappSettingsRecord {
            phone_number: phone.to_string(),
            greeting: "Hello Florette!".to_string(),
            enabled,
            updated_at: now(),
        });
    }

    pub async fn set_setting(&self, key: &str, value: &str) {
        self.state.lock().await.settings.insert(
            key.to_string(),
            SiteSettingRecord {
                key: key.to_string(),
                value: value.to_string(),
                updated_at: now(),
            },
        );
    }

    pub async fn add_banned(&self, word: &str) {
        self.state.lock().await.banned.push(BannedWordRecord {
            id: Uuid::new_v4(),
            word: word.to_string(),
            created_at: now(),
        });
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn expire_all_sessions(&self) {
        let past = now() - time::Duration::minutes(1);
        for session in self.state.lock().await.sessions.iter_mut() {
            session.expires_at = past;
        }
    }
}

fn collection_ref(state: &State, id: Option<Uuid>) -> Result<Option<RecordRef>, RepoError> {
    match id {
        None => Ok(None),
        Some(id) => state
            .collections
            .iter()
            .find(|c| c.id == id)
            .map(|c| {
                Some(RecordRef {
                    id: c.id,
                    slug: c.slug.clone(),
                    name: c.name.clone(),
                })
            })
            .ok_or_else(|| RepoError::InvalidInput {
                message: "products_collection_id_fkey".to_string(),
            }),
    }
}

fn product_visible(state: &State, scope: ListScope, product: &ProductRecord) -> bool {
    if !scope.is_public() {
        return true;
    }
    let collection_visible = product.collection.as_ref().is_none_or(|link| {
        state
            .collections
            .iter()
            .any(|c| c.id == link.id && c.visible)
    });
    product.visible && collection_visible
}

fn has_link(state: &State, scope: ListScope, product: Uuid, kind: TaxonomyKind, slug: &str) -> bool {
    state.links.iter().any(|(pid, k, tid)| {
        *pid == product
            && *k == kind
            && state
                .taxonomies
                .iter()
                .any(|t| t.id == *tid && t.slug == slug && visible_for(scope, t.visible))
    })
}

fn unique_slug(existing: impl IntoIterator<Item = String>, slug: &str) -> Result<(), RepoError> {
    if existing.into_iter().any(|s| s == slug) {
        Err(RepoError::Duplicate {
            constraint: "slug_key".to_string(),
        })
    } else {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn list_collections(&self, scope: ListScope) -> Result<Vec<CollectionRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut items: Vec<_> = state
            .collections
            .iter()
            .filter(|c| visible_for(scope, c.visible))
            .cloned()
            .collect();
        items.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        Ok(items)
    }

    async fn find_collection_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<CollectionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .collections
            .iter()
            .find(|c| c.slug == slug && visible_for(scope, c.visible))
            .cloned())
    }

    async fn find_collection_by_id(&self, id: Uuid) -> Result<Option<CollectionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.collections.iter().find(|c| c.id == id).cloned())
    }

    async fn list_products(
        &self,
        scope: ListScope,
        filter: &ProductQueryFilter,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        self.product_list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        let mut items: Vec<_> = state
            .products
            .iter()
            .filter(|p| product_visible(&state, scope, p))
            .filter(|p| {
                filter.collection.as_deref().is_none_or(|slug| {
                    p.collection.as_ref().is_some_and(|c| c.slug == slug)
                })
            })
            .filter(|p| {
                filter.celebration.as_deref().is_none_or(|slug| {
                    has_link(&state, scope, p.id, TaxonomyKind::Celebration, slug)
                })
            })
            .filter(|p| {
                filter.relationship.as_deref().is_none_or(|slug| {
                    has_link(&state, scope, p.id, TaxonomyKind::Relationship, slug)
                })
            })
            .filter(|p| {
                filter.search.as_deref().is_none_or(|term| {
                    let term = term.to_lowercase();
                    p.name.to_lowercase().contains(&term) || p.slug.contains(&term)
                })
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        Ok(items)
    }

    async fn find_product_by_slug(
        &self,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<ProductRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .find(|p| p.slug == slug && product_visible(&state, scope, p))
            .cloned())
    }

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
    ) -> Result<Vec<RecordRef>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .links
            .iter()
            .filter(|(pid, k, _)| *pid == product_id && *k == kind)
            .filter_map(|(_, _, tid)| state.taxonomies.iter().find(|t| t.id == *tid))
            .map(|t| RecordRef {
                id: t.id,
                slug: t.slug.clone(),
                name: t.name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl CatalogWriteRepo for MemoryStore {
    async fn create_collection(&self, params: CollectionParams) -> Result<CollectionRecord, RepoError> {
        let mut state = self.state.lock().await;
        unique_slug(state.collections.iter().map(|c| c.slug.clone()), &params.slug)?;
        let record = CollectionRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            description: params.description,
            image_url: params.image_url,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        state.collections.push(record.clone());
        Ok(record)
    }

    async fn update_collection(
        &self,
        id: Uuid,
        params: CollectionParams,
    ) -> Result<CollectionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        record.slug = params.slug;
        record.name = params.name;
        record.description = params.description;
        record.image_url = params.image_url;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_collection(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.collections.len();
        state.collections.retain(|c| c.id != id);
        if state.collections.len() == before {
            return Err(RepoError::NotFound);
        }
        for product in state.products.iter_mut() {
            if product.collection.as_ref().is_some_and(|c| c.id == id) {
                product.collection = None;
            }
        }
        Ok(())
    }

    async fn create_product(&self, params: ProductParams) -> Result<ProductRecord, RepoError> {
        let mut state = self.state.lock().await;
        unique_slug(state.products.iter().map(|p| p.slug.clone()), &params.slug)?;
        let collection = collection_ref(&state, params.collection_id)?;
        let record = ProductRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            name: params.name,
            description: params.description,
            price_cents: params.price_cents,
            compare_at_price_cents: params.compare_at_price_cents,
            currency: params.currency,
            images: params.images,
            collection,
            in_stock: params.in_stock,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        state.products.push(record.clone());
        Ok(record)
    }

    async fn update_product(&self, id: Uuid, params: ProductParams) -> Result<ProductRecord, RepoError> {
        let mut state = self.state.lock().await;
        let collection = collection_ref(&state, params.collection_id)?;
        let record = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        record.slug = params.slug;
        record.name = params.name;
        record.description = params.description;
        record.price_cents = params.price_cents;
        record.compare_at_price_cents = params.compare_at_price_cents;
        record.currency = params.currency;
        record.images = params.images;
        record.collection = collection;
        record.in_stock = params.in_stock;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn set_product_visibility(&self, id: Uuid, visible: bool) -> Result<ProductRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        record.visible = visible;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        if state.products.len() == before {
            return Err(RepoError::NotFound);
        }
        state.links.retain(|(pid, _, _)| *pid != id);
        state.featured.retain(|f| f.product.id != id);
        Ok(())
    }

    async fn replace_product_taxonomies(
        &self,
        product_id: Uuid,
        kind: TaxonomyKind,
        taxonomy_ids: &[Uuid],
    ) -> Result<Vec<RecordRef>, RepoError> {
        {
            let mut state = self.state.lock().await;
            if let Some(missing) = taxonomy_ids
                .iter()
                .find(|id| !state.taxonomies.iter().any(|t| t.id == **id && t.kind == kind))
            {
                return Err(RepoError::InvalidInput {
                    message: format!("unknown {} {missing}", kind.as_str()),
                });
            }
            state
                .links
                .retain(|(pid, k, _)| !(*pid == product_id && *k == kind));
            for id in taxonomy_ids {
                state.links.push((product_id, kind, *id));
            }
        }
        self.list_product_taxonomies(product_id, kind).await
    }
}

#[async_trait]
impl TaxonomyRepo for MemoryStore {
    async fn list_taxonomies(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
    ) -> Result<Vec<TaxonomyRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .taxonomies
            .iter()
            .filter(|t| t.kind == kind && visible_for(scope, t.visible))
            .cloned()
            .collect())
    }

    async fn find_taxonomy_by_slug(
        &self,
        kind: TaxonomyKind,
        scope: ListScope,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .taxonomies
            .iter()
            .find(|t| t.kind == kind && t.slug == slug && visible_for(scope, t.visible))
            .cloned())
    }

    async fn find_taxonomy_by_id(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
    ) -> Result<Option<TaxonomyRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .taxonomies
            .iter()
            .find(|t| t.kind == kind && t.id == id)
            .cloned())
    }
}

#[async_trait]
impl TaxonomyWriteRepo for MemoryStore {
    async fn create_taxonomy(
        &self,
        kind: TaxonomyKind,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let mut state = self.state.lock().await;
        unique_slug(
            state
                .taxonomies
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.slug.clone()),
            &params.slug,
        )?;
        let record = TaxonomyRecord {
            id: Uuid::new_v4(),
            kind,
            slug: params.slug,
            name: params.name,
            description: params.description,
            image_url: params.image_url,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        state.taxonomies.push(record.clone());
        Ok(record)
    }

    async fn update_taxonomy(
        &self,
        kind: TaxonomyKind,
        id: Uuid,
        params: TaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .taxonomies
            .iter_mut()
            .find(|t| t.kind == kind && t.id == id)
            .ok_or(RepoError::NotFound)?;
        record.slug = params.slug;
        record.name = params.name;
        record.description = params.description;
        record.image_url = params.image_url;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_taxonomy(&self, kind: TaxonomyKind, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        let before = state.taxonomies.len();
        state.taxonomies.retain(|t| !(t.kind == kind && t.id == id));
        if state.taxonomies.len() == before {
            return Err(RepoError::NotFound);
        }
        state.links.retain(|(_, k, tid)| !(*k == kind && *tid == id));
        Ok(())
    }
}

macro_rules! take_or_not_found {
    ($list:expr, $id:expr) => {{
        let before = $list.len();
        $list.retain(|item| item.id != $id);
        if $list.len() == before {
            Err(RepoError::NotFound)
        } else {
            Ok(())
        }
    }};
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn list_testimonials(&self, scope: ListScope) -> Result<Vec<TestimonialRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .testimonials
            .iter()
            .filter(|t| visible_for(scope, t.visible))
            .cloned()
            .collect())
    }

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.testimonials.iter().find(|t| t.id == id).cloned())
    }

    async fn list_banners(&self, scope: ListScope) -> Result<Vec<BannerRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .banners
            .iter()
            .filter(|b| visible_for(scope, b.visible))
            .cloned()
            .collect())
    }

    async fn find_banner(&self, id: Uuid) -> Result<Option<BannerRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.banners.iter().find(|b| b.id == id).cloned())
    }

    async fn list_featured_items(&self, scope: ListScope) -> Result<Vec<FeaturedItemRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .featured
            .iter()
            .filter(|f| visible_for(scope, f.visible))
            .filter(|f| {
                !scope.is_public()
                    || state
                        .products
                        .iter()
                        .any(|p| p.id == f.product.id && product_visible(&state, scope, p))
            })
            .cloned()
            .collect())
    }

    async fn find_featured_item(&self, id: Uuid) -> Result<Option<FeaturedItemRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.featured.iter().find(|f| f.id == id).cloned())
    }

    async fn list_announcements(
        &self,
        scope: ListScope,
        now: OffsetDateTime,
    ) -> Result<Vec<AnnouncementRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .announcements
            .iter()
            .filter(|a| visible_for(scope, a.visible))
            .filter(|a| !scope.is_public() || a.is_active_at(now))
            .cloned()
            .collect())
    }

    async fn find_announcement(&self, id: Uuid) -> Result<Option<AnnouncementRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.announcements.iter().find(|a| a.id == id).cloned())
    }

    async fn list_review_videos(&self, scope: ListScope) -> Result<Vec<ReviewVideoRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .review_videos
            .iter()
            .filter(|v| visible_for(scope, v.visible))
            .cloned()
            .collect())
    }

    async fn find_review_video(&self, id: Uuid) -> Result<Option<ReviewVideoRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.review_videos.iter().find(|v| v.id == id).cloned())
    }
}

#[async_trait]
impl ContentWriteRepo for MemoryStore {
    async fn create_testimonial(&self, params: TestimonialParams) -> Result<TestimonialRecord, RepoError> {
        let record = TestimonialRecord {
            id: Uuid::new_v4(),
            author_name: params.author_name,
            author_title: params.author_title,
            quote: params.quote,
            rating: params.rating,
            avatar_url: params.avatar_url,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.testimonials.push(record.clone());
        Ok(record)
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .testimonials
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(RepoError::NotFound)?;
        record.author_name = params.author_name;
        record.author_title = params.author_title;
        record.quote = params.quote;
        record.rating = params.rating;
        record.avatar_url = params.avatar_url;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.testimonials, id)
    }

    async fn create_banner(&self, params: BannerParams) -> Result<BannerRecord, RepoError> {
        let record = BannerRecord {
            id: Uuid::new_v4(),
            title: params.title,
            subtitle: params.subtitle,
            image_url: params.image_url,
            link_url: params.link_url,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.banners.push(record.clone());
        Ok(record)
    }

    async fn update_banner(&self, id: Uuid, params: BannerParams) -> Result<BannerRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .banners
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.subtitle = params.subtitle;
        record.image_url = params.image_url;
        record.link_url = params.link_url;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.banners, id)
    }

    async fn create_featured_item(
        &self,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError> {
        let mut state = self.state.lock().await;
        let product = state
            .products
            .iter()
            .find(|p| p.id == params.product_id)
            .map(|p| RecordRef {
                id: p.id,
                slug: p.slug.clone(),
                name: p.name.clone(),
            })
            .ok_or_else(|| RepoError::InvalidInput {
                message: "featured_items_product_id_fkey".to_string(),
            })?;
        let record = FeaturedItemRecord {
            id: Uuid::new_v4(),
            product,
            label: params.label,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        state.featured.push(record.clone());
        Ok(record)
    }

    async fn update_featured_item(
        &self,
        id: Uuid,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError> {
        let mut state = self.state.lock().await;
        let product = state
            .products
            .iter()
            .find(|p| p.id == params.product_id)
            .map(|p| RecordRef {
                id: p.id,
                slug: p.slug.clone(),
                name: p.name.clone(),
            })
            .ok_or(RepoError::NotFound)?;
        let record = state
            .featured
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(RepoError::NotFound)?;
        record.product = product;
        record.label = params.label;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_featured_item(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.featured, id)
    }

    async fn create_announcement(
        &self,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError> {
        let record = AnnouncementRecord {
            id: Uuid::new_v4(),
            message: params.message,
            link_url: params.link_url,
            starts_at: params.starts_at,
            ends_at: params.ends_at,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.announcements.push(record.clone());
        Ok(record)
    }

    async fn update_announcement(
        &self,
        id: Uuid,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .announcements
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepoError::NotFound)?;
        record.message = params.message;
        record.link_url = params.link_url;
        record.starts_at = params.starts_at;
        record.ends_at = params.ends_at;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_announcement(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.announcements, id)
    }

    async fn create_review_video(
        &self,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError> {
        let record = ReviewVideoRecord {
            id: Uuid::new_v4(),
            title: params.title,
            video_url: params.video_url,
            thumbnail_url: params.thumbnail_url,
            visible: params.visible,
            sort_order: params.sort_order,
            created_at: now(),
            updated_at: now(),
        };
        self.state.lock().await.review_videos.push(record.clone());
        Ok(record)
    }

    async fn update_review_video(
        &self,
        id: Uuid,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = state
            .review_videos
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.video_url = params.video_url;
        record.thumbnail_url = params.thumbnail_url;
        record.visible = params.visible;
        record.sort_order = params.sort_order;
        record.updated_at = now();
        Ok(record.clone())
    }

    async fn delete_review_video(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.review_videos, id)
    }
}

#[async_trait]
impl SettingsRepo for MemoryStore {
    async fn list_site_settings(&self) -> Result<Vec<SiteSettingRecord>, RepoError> {
        Ok(self.state.lock().await.settings.values().cloned().collect())
    }

    async fn upsert_site_setting(&self, key: &str, value: &str) -> Result<SiteSettingRecord, RepoError> {
        let record = SiteSettingRecord {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now(),
        };
        self.state
            .lock()
            .await
            .settings
            .insert(key.to_string(), record.clone());
        Ok(record)
    }

    async fn delete_site_setting(&self, key: &str) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .settings
            .remove(key)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn load_whatsapp_settings(&self) -> Result<WhatsappSettingsRecord, RepoError> {
        Ok(self
            .state
            .lock()
            .await
            .whatsapp
            .clone()
            .unwrap_or_else(|| WhatsappSettingsRecord {
                phone_number: String::new(),
                greeting: String::new(),
                enabled: false,
                updated_at: now(),
            }))
    }

    async fn update_whatsapp_settings(
        &self,
        params: WhatsappSettingsParams,
    ) -> Result<WhatsappSettingsRecord, RepoError> {
        let record = WhatsappSettingsRecord {
            phone_number: params.phone_number,
            greeting: params.greeting,
            enabled: params.enabled,
            updated_at: now(),
        };
        self.state.lock().await.whatsapp = Some(record.clone());
        Ok(record)
    }

    async fn list_banned_words(&self) -> Result<Vec<BannedWordRecord>, RepoError> {
        Ok(self.state.lock().await.banned.clone())
    }

    async fn create_banned_word(&self, word: &str) -> Result<BannedWordRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.banned.iter().any(|b| b.word == word) {
            return Err(RepoError::Duplicate {
                constraint: "banned_words_word_key".to_string(),
            });
        }
        let record = BannedWordRecord {
            id: Uuid::new_v4(),
            word: word.to_string(),
            created_at: now(),
        };
        state.banned.push(record.clone());
        Ok(record)
    }

    async fn delete_banned_word(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        take_or_not_found!(state.banned, id)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        token_hash: &[u8],
        expires_at: OffsetDateTime,
    ) -> Result<AdminSessionRecord, RepoError> {
        let record = AdminSessionRecord {
            id: Uuid::new_v4(),
            token_hash: token_hash.to_vec(),
            created_at: now(),
            expires_at,
            last_seen_at: None,
        };
        self.state.lock().await.sessions.push(record.clone());
        Ok(record)
    }

    async fn find_active_session(
        &self,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<Option<AdminSessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
            .cloned())
    }

    async fn touch_session(&self, id: Uuid, now: OffsetDateTime) -> Result<(), RepoError> {
        if let Some(session) = self
            .state
            .lock()
            .await
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
        {
            session.last_seen_at = Some(now);
        }
        Ok(())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .sessions
            .retain(|s| s.token_hash != token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub public: Router,
    pub admin: Router,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<StorefrontCache>,
}

pub struct AppOptions<'a> {
    pub uploads_dir: &'a Path,
    pub publisher: Option<Arc<dyn UploadPublisher>>,
    pub max_request_bytes: usize,
    pub login_max_attempts: u32,
}

impl<'a> AppOptions<'a> {
    pub fn new(uploads_dir: &'a Path) -> Self {
        Self {
            uploads_dir,
            publisher: None,
            max_request_bytes: 1024 * 1024,
            login_max_attempts: 10,
        }
    }
}

pub fn password_digest() -> [u8; 32] {
    let encoded = AdminAuthService::hash_password(ADMIN_PASSWORD);
    let bytes = hex::decode(encoded).expect("hex digest");
    bytes.try_into().expect("32-byte digest")
}

pub fn build_app(store: Arc<MemoryStore>, options: AppOptions<'_>) -> TestApp {
    let cache = Arc::new(StorefrontCache::new(&CacheConfig::default()));
    let storefront = StorefrontService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
    );
    let ordering = OrderingService::new(storefront.clone(), store.clone());
    let storage = UploadStorage::new(options.uploads_dir.to_path_buf()).expect("upload storage");
    let uploads = Arc::new(UploadService::new(
        Arc::new(storage),
        options.publisher,
        "/uploads",
    ));

    let public = build_public_router(PublicState {
        storefront,
        ordering,
        uploads: uploads.clone(),
        health: store.clone(),
    });

    let admin = build_admin_router(AdminState {
        auth: Arc::new(AdminAuthService::new(
            store.clone(),
            Some(password_digest()),
            Duration::from_secs(3600),
        )),
        catalog: Arc::new(AdminCatalogService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
        )),
        taxonomy: Arc::new(AdminTaxonomyService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
        )),
        content: Arc::new(AdminContentService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            cache.clone(),
        )),
        settings: Arc::new(AdminSettingsService::new(store.clone(), cache.clone())),
        uploads,
        cache: cache.clone(),
        health: store.clone(),
        login_limiter: LoginRateLimiter::new(Duration::from_secs(60), options.login_max_attempts),
        cookie_secure: false,
        max_request_bytes: options.max_request_bytes,
    });

    TestApp {
        public,
        admin,
        store,
        cache,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("response body")
        .to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn authed(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request")
}

/// Log in and return the `name=value` pair to send back as a `Cookie` header.
pub async fn login(app: &TestApp) -> String {
    let response = send(
        &app.admin,
        json_request(
            "POST",
            "/api/session",
            None,
            serde_json::json!({ "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    let pair = set_cookie.split(';').next().expect("cookie pair").trim();
    assert!(pair.starts_with(&format!("{SESSION_COOKIE}=")));
    pair.to_string()
}

pub const MULTIPART_BOUNDARY: &str = "florette-test-boundary";

/// Multipart body with optional `file` part plus text fields.
pub fn multipart_body(file: Option<(&str, &str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(cookie: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/uploads")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

/// Stores nothing and fails every publish.
pub struct FailingPublisher {
    pub calls: AtomicUsize,
}

#[async_trait]
impl UploadPublisher for FailingPublisher {
    async fn publish(
        &self,
        _absolute_path: &Path,
        _message: &str,
    ) -> Result<Option<String>, florette::infra::error::InfraError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(florette::infra::error::InfraError::publish(
            "push",
            "remote rejected",
        ))
    }
}
