use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        AnnouncementParams, BannerParams, ContentRepo, ContentWriteRepo, FeaturedItemParams,
        RepoError, ReviewVideoParams, TestimonialParams,
    },
    domain::entities::{
        AnnouncementRecord, BannerRecord, FeaturedItemRecord, RecordRef, ReviewVideoRecord,
        TestimonialRecord,
    },
    domain::types::ListScope,
};

use super::{PostgresRepositories, map_sqlx_error};

const TESTIMONIAL_COLUMNS: &str = "id, author_name, author_title, quote, rating, avatar_url, \
    visible, sort_order, created_at, updated_at";
const BANNER_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, visible, sort_order, created_at, updated_at";
const ANNOUNCEMENT_COLUMNS: &str = "id, message, link_url, starts_at, ends_at, visible, \
    sort_order, created_at, updated_at";
const REVIEW_VIDEO_COLUMNS: &str =
    "id, title, video_url, thumbnail_url, visible, sort_order, created_at, updated_at";
const FEATURED_SELECT: &str = "f.id, f.label, f.visible, f.sort_order, f.created_at, \
    f.updated_at, p.id AS product_id, p.slug AS product_slug, p.name AS product_name";

#[derive(sqlx::FromRow)]
struct TestimonialRow {
    id: Uuid,
    author_name: String,
    author_title: Option<String>,
    quote: String,
    rating: i16,
    avatar_url: Option<String>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TestimonialRow> for TestimonialRecord {
    fn from(row: TestimonialRow) -> Self {
        Self {
            id: row.id,
            author_name: row.author_name,
            author_title: row.author_title,
            quote: row.quote,
            rating: row.rating,
            avatar_url: row.avatar_url,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: Uuid,
    title: String,
    subtitle: Option<String>,
    image_url: String,
    link_url: Option<String>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BannerRow> for BannerRecord {
    fn from(row: BannerRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            link_url: row.link_url,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FeaturedRow {
    id: Uuid,
    label: Option<String>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    product_id: Uuid,
    product_slug: String,
    product_name: String,
}

impl From<FeaturedRow> for FeaturedItemRecord {
    fn from(row: FeaturedRow) -> Self {
        Self {
            id: row.id,
            product: RecordRef {
                id: row.product_id,
                slug: row.product_slug,
                name: row.product_name,
            },
            label: row.label,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    id: Uuid,
    message: String,
    link_url: Option<String>,
    starts_at: Option<OffsetDateTime>,
    ends_at: Option<OffsetDateTime>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<AnnouncementRow> for AnnouncementRecord {
    fn from(row: AnnouncementRow) -> Self {
        Self {
            id: row.id,
            message: row.message,
            link_url: row.link_url,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewVideoRow {
    id: Uuid,
    title: String,
    video_url: String,
    thumbnail_url: Option<String>,
    visible: bool,
    sort_order: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ReviewVideoRow> for ReviewVideoRecord {
    fn from(row: ReviewVideoRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            visible: row.visible,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn list_testimonials(
        &self,
        scope: ListScope,
    ) -> Result<Vec<TestimonialRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials t WHERE 1=1 "
        ));
        Self::apply_scope(&mut qb, scope, "t");
        qb.push(" ORDER BY t.sort_order ASC, t.created_at DESC");

        let rows = qb
            .build_query_as::<TestimonialRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TestimonialRecord::from).collect())
    }

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TestimonialRecord::from))
    }

    async fn list_banners(&self, scope: ListScope) -> Result<Vec<BannerRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {BANNER_COLUMNS} FROM banners b WHERE 1=1 "
        ));
        Self::apply_scope(&mut qb, scope, "b");
        qb.push(" ORDER BY b.sort_order ASC, b.created_at DESC");

        let rows = qb
            .build_query_as::<BannerRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BannerRecord::from).collect())
    }

    async fn find_banner(&self, id: Uuid) -> Result<Option<BannerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            "SELECT {BANNER_COLUMNS} FROM banners WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BannerRecord::from))
    }

    async fn list_featured_items(
        &self,
        scope: ListScope,
    ) -> Result<Vec<FeaturedItemRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {FEATURED_SELECT} FROM featured_items f \
             INNER JOIN products p ON p.id = f.product_id WHERE 1=1 "
        ));
        if scope.is_public() {
            qb.push(" AND f.visible AND p.visible ");
        }
        qb.push(" ORDER BY f.sort_order ASC, f.created_at DESC");

        let rows = qb
            .build_query_as::<FeaturedRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeaturedItemRecord::from).collect())
    }

    async fn find_featured_item(
        &self,
        id: Uuid,
    ) -> Result<Option<FeaturedItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, FeaturedRow>(&format!(
            "SELECT {FEATURED_SELECT} FROM featured_items f \
             INNER JOIN products p ON p.id = f.product_id WHERE f.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FeaturedItemRecord::from))
    }

    async fn list_announcements(
        &self,
        scope: ListScope,
        now: OffsetDateTime,
    ) -> Result<Vec<AnnouncementRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements a WHERE 1=1 "
        ));
        if scope.is_public() {
            qb.push(" AND a.visible AND (a.starts_at IS NULL OR a.starts_at <= ");
            qb.push_bind(now);
            qb.push(") AND (a.ends_at IS NULL OR a.ends_at > ");
            qb.push_bind(now);
            qb.push(")");
        }
        qb.push(" ORDER BY a.sort_order ASC, a.created_at DESC");

        let rows = qb
            .build_query_as::<AnnouncementRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(AnnouncementRecord::from).collect())
    }

    async fn find_announcement(
        &self,
        id: Uuid,
    ) -> Result<Option<AnnouncementRecord>, RepoError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AnnouncementRecord::from))
    }

    async fn list_review_videos(
        &self,
        scope: ListScope,
    ) -> Result<Vec<ReviewVideoRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {REVIEW_VIDEO_COLUMNS} FROM review_videos v WHERE 1=1 "
        ));
        Self::apply_scope(&mut qb, scope, "v");
        qb.push(" ORDER BY v.sort_order ASC, v.created_at DESC");

        let rows = qb
            .build_query_as::<ReviewVideoRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReviewVideoRecord::from).collect())
    }

    async fn find_review_video(&self, id: Uuid) -> Result<Option<ReviewVideoRecord>, RepoError> {
        let row = sqlx::query_as::<_, ReviewVideoRow>(&format!(
            "SELECT {REVIEW_VIDEO_COLUMNS} FROM review_videos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ReviewVideoRecord::from))
    }
}

#[async_trait]
impl ContentWriteRepo for PostgresRepositories {
    async fn create_testimonial(
        &self,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "INSERT INTO testimonials (id, author_name, author_title, quote, rating, avatar_url, \
                 visible, sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.author_name)
        .bind(params.author_title)
        .bind(params.quote)
        .bind(params.rating)
        .bind(params.avatar_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(TestimonialRecord::from(row))
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "UPDATE testimonials \
             SET author_name = $2, author_title = $3, quote = $4, rating = $5, \
                 avatar_url = $6, visible = $7, sort_order = $8, updated_at = now() \
             WHERE id = $1 \
             RETURNING {TESTIMONIAL_COLUMNS}"
        ))
        .bind(id)
        .bind(params.author_name)
        .bind(params.author_title)
        .bind(params.quote)
        .bind(params.rating)
        .bind(params.avatar_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(TestimonialRecord::from(row))
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("testimonials", id).await
    }

    async fn create_banner(&self, params: BannerParams) -> Result<BannerRecord, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            "INSERT INTO banners (id, title, subtitle, image_url, link_url, visible, sort_order, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {BANNER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.title)
        .bind(params.subtitle)
        .bind(params.image_url)
        .bind(params.link_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BannerRecord::from(row))
    }

    async fn update_banner(
        &self,
        id: Uuid,
        params: BannerParams,
    ) -> Result<BannerRecord, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(&format!(
            "UPDATE banners \
             SET title = $2, subtitle = $3, image_url = $4, link_url = $5, visible = $6, \
                 sort_order = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {BANNER_COLUMNS}"
        ))
        .bind(id)
        .bind(params.title)
        .bind(params.subtitle)
        .bind(params.image_url)
        .bind(params.link_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BannerRecord::from(row))
    }

    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("banners", id).await
    }

    async fn create_featured_item(
        &self,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError> {
        let row = sqlx::query_as::<_, FeaturedRow>(&format!(
            "WITH f AS ( \
                 INSERT INTO featured_items (id, product_id, label, visible, sort_order, \
                     created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $6) \
                 RETURNING * \
             ) \
             SELECT {FEATURED_SELECT} FROM f INNER JOIN products p ON p.id = f.product_id"
        ))
        .bind(Uuid::new_v4())
        .bind(params.product_id)
        .bind(params.label)
        .bind(params.visible)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FeaturedItemRecord::from(row))
    }

    async fn update_featured_item(
        &self,
        id: Uuid,
        params: FeaturedItemParams,
    ) -> Result<FeaturedItemRecord, RepoError> {
        let row = sqlx::query_as::<_, FeaturedRow>(&format!(
            "WITH f AS ( \
                 UPDATE featured_items \
                 SET product_id = $2, label = $3, visible = $4, sort_order = $5, \
                     updated_at = now() \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {FEATURED_SELECT} FROM f INNER JOIN products p ON p.id = f.product_id"
        ))
        .bind(id)
        .bind(params.product_id)
        .bind(params.label)
        .bind(params.visible)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FeaturedItemRecord::from(row))
    }

    async fn delete_featured_item(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("featured_items", id).await
    }

    async fn create_announcement(
        &self,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "INSERT INTO announcements (id, message, link_url, starts_at, ends_at, visible, \
                 sort_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.message)
        .bind(params.link_url)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.visible)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AnnouncementRecord::from(row))
    }

    async fn update_announcement(
        &self,
        id: Uuid,
        params: AnnouncementParams,
    ) -> Result<AnnouncementRecord, RepoError> {
        let row = sqlx::query_as::<_, AnnouncementRow>(&format!(
            "UPDATE announcements \
             SET message = $2, link_url = $3, starts_at = $4, ends_at = $5, visible = $6, \
                 sort_order = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(params.message)
        .bind(params.link_url)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.visible)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AnnouncementRecord::from(row))
    }

    async fn delete_announcement(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("announcements", id).await
    }

    async fn create_review_video(
        &self,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewVideoRow>(&format!(
            "INSERT INTO review_videos (id, title, video_url, thumbnail_url, visible, sort_order, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING {REVIEW_VIDEO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.title)
        .bind(params.video_url)
        .bind(params.thumbnail_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ReviewVideoRecord::from(row))
    }

    async fn update_review_video(
        &self,
        id: Uuid,
        params: ReviewVideoParams,
    ) -> Result<ReviewVideoRecord, RepoError> {
        let row = sqlx::query_as::<_, ReviewVideoRow>(&format!(
            "UPDATE review_videos \
             SET title = $2, video_url = $3, thumbnail_url = $4, visible = $5, \
                 sort_order = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING {REVIEW_VIDEO_COLUMNS}"
        ))
        .bind(id)
        .bind(params.title)
        .bind(params.video_url)
        .bind(params.thumbnail_url)
        .bind(params.visible)
        .bind(params.sort_order)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ReviewVideoRecord::from(row))
    }

    async fn delete_review_video(&self, id: Uuid) -> Result<(), RepoError> {
        self.delete_by_id("review_videos", id).await
    }
}
