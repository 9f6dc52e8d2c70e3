use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{default_visible, optional, required};
use crate::application::repos::{
    AnnouncementParams, BannerParams, CatalogRepo, ContentRepo, ContentWriteRepo,
    FeaturedItemParams, RepoError, ReviewVideoParams, TestimonialParams,
};
use crate::application::storefront::StorefrontCache;
use crate::domain::entities::{
    AnnouncementRecord, BannerRecord, FeaturedItemRecord, ReviewVideoRecord, TestimonialRecord,
};
use crate::domain::types::ListScope;

#[derive(Debug, Error)]
pub enum AdminContentError {
    #[error("invalid value for `{0}`")]
    ConstraintViolation(&'static str),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

fn violation(field: &'static str) -> AdminContentError {
    AdminContentError::ConstraintViolation(field)
}

fn default_rating() -> i16 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestimonialCommand {
    pub author_name: String,
    #[serde(default)]
    pub author_title: Option<String>,
    pub quote: String,
    #[serde(default = "default_rating")]
    pub rating: i16,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerCommand {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeaturedItemCommand {
    pub product_id: Uuid,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementCommand {
    pub message: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewVideoCommand {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// Homepage content: testimonials, banners, featured items, announcements and
/// review videos.
#[derive(Clone)]
pub struct AdminContentService {
    reader: Arc<dyn ContentRepo>,
    writer: Arc<dyn ContentWriteRepo>,
    catalog: Arc<dyn CatalogRepo>,
    cache: Arc<StorefrontCache>,
}

impl AdminContentService {
    pub fn new(
        reader: Arc<dyn ContentRepo>,
        writer: Arc<dyn ContentWriteRepo>,
        catalog: Arc<dyn CatalogRepo>,
        cache: Arc<StorefrontCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            catalog,
            cache,
        }
    }

    pub async fn list_testimonials(&self) -> Result<Vec<TestimonialRecord>, AdminContentError> {
        Ok(self.reader.list_testimonials(ListScope::Admin).await?)
    }

    pub async fn testimonial(&self, id: Uuid) -> Result<TestimonialRecord, AdminContentError> {
        self.reader
            .find_testimonial(id)
            .await?
            .ok_or(AdminContentError::NotFound {
                entity: "testimonial",
            })
    }

    pub async fn create_testimonial(
        &self,
        command: TestimonialCommand,
    ) -> Result<TestimonialRecord, AdminContentError> {
        let params = testimonial_params(command)?;
        let record = self.writer.create_testimonial(params).await?;
        self.written("testimonial.create", record.id);
        Ok(record)
    }

    pub async fn update_testimonial(
        &self,
        id: Uuid,
        command: TestimonialCommand,
    ) -> Result<TestimonialRecord, AdminContentError> {
        let params = testimonial_params(command)?;
        let record = self.writer.update_testimonial(id, params).await?;
        self.written("testimonial.update", id);
        Ok(record)
    }

    pub async fn delete_testimonial(&self, id: Uuid) -> Result<(), AdminContentError> {
        self.writer.delete_testimonial(id).await?;
        self.written("testimonial.delete", id);
        Ok(())
    }

    pub async fn list_banners(&self) -> Result<Vec<BannerRecord>, AdminContentError> {
        Ok(self.reader.list_banners(ListScope::Admin).await?)
    }

    pub async fn banner(&self, id: Uuid) -> Result<BannerRecord, AdminContentError> {
        self.reader
            .find_banner(id)
            .await?
            .ok_or(AdminContentError::NotFound { entity: "banner" })
    }

    pub async fn create_banner(
        &self,
        command: BannerCommand,
    ) -> Result<BannerRecord, AdminContentError> {
        let params = banner_params(command)?;
        let record = self.writer.create_banner(params).await?;
        self.written("banner.create", record.id);
        Ok(record)
    }

    pub async fn update_banner(
        &self,
        id: Uuid,
        command: BannerCommand,
    ) -> Result<BannerRecord, AdminContentError> {
        let params = banner_params(command)?;
        let record = self.writer.update_banner(id, params).await?;
        self.written("banner.update", id);
        Ok(record)
    }

    pub async fn delete_banner(&self, id: Uuid) -> Result<(), AdminContentError> {
        self.writer.delete_banner(id).await?;
        self.written("banner.delete", id);
        Ok(())
    }

    pub async fn list_featured(&self) -> Result<Vec<FeaturedItemRecord>, AdminContentError> {
        Ok(self.reader.list_featured_items(ListScope::Admin).await?)
    }

    pub async fn featured_item(&self, id: Uuid) -> Result<FeaturedItemRecord, AdminContentError> {
        self.reader
            .find_featured_item(id)
            .await?
            .ok_or(AdminContentError::NotFound {
                entity: "featured item",
            })
    }

    pub async fn create_featured_item(
        &self,
        command: FeaturedItemCommand,
    ) -> Result<FeaturedItemRecord, AdminContentError> {
        let params = self.featured_params(command).await?;
        let record = self.writer.create_featured_item(params).await?;
        self.written("featured.create", record.id);
        Ok(record)
    }

    pub async fn update_featured_item(
        &self,
        id: Uuid,
        command: FeaturedItemCommand,
    ) -> Result<FeaturedItemRecord, AdminContentError> {
        let params = self.featured_params(command).await?;
        let record = self.writer.update_featured_item(id, params).await?;
        self.written("featured.update", id);
        Ok(record)
    }

    pub async fn delete_featured_item(&self, id: Uuid) -> Result<(), AdminContentError> {
        self.writer.delete_featured_item(id).await?;
        self.written("featured.delete", id);
        Ok(())
    }

    /// Admin listing ignores schedule windows.
    pub async fn list_announcements(&self) -> Result<Vec<AnnouncementRecord>, AdminContentError> {
        Ok(self
            .reader
            .list_announcements(ListScope::Admin, OffsetDateTime::now_utc())
            .await?)
    }

    pub async fn announcement(&self, id: Uuid) -> Result<AnnouncementRecord, AdminContentError> {
        self.reader
            .find_announcement(id)
            .await?
            .ok_or(AdminContentError::NotFound {
                entity: "announcement",
            })
    }

    pub async fn create_announcement(
        &self,
        command: AnnouncementCommand,
    ) -> Result<AnnouncementRecord, AdminContentError> {
        let params = announcement_params(command)?;
        let record = self.writer.create_announcement(params).await?;
        self.written("announcement.create", record.id);
        Ok(record)
    }

    pub async fn update_announcement(
        &self,
        id: Uuid,
        command: AnnouncementCommand,
    ) -> Result<AnnouncementRecord, AdminContentError> {
        let params = announcement_params(command)?;
        let record = self.writer.update_announcement(id, params).await?;
        self.written("announcement.update", id);
        Ok(record)
    }

    pub async fn delete_announcement(&self, id: Uuid) -> Result<(), AdminContentError> {
        self.writer.delete_announcement(id).await?;
        self.written("announcement.delete", id);
        Ok(())
    }

    pub async fn list_review_videos(&self) -> Result<Vec<ReviewVideoRecord>, AdminContentError> {
        Ok(self.reader.list_review_videos(ListScope::Admin).await?)
    }

    pub async fn review_video(&self, id: Uuid) -> Result<ReviewVideoRecord, AdminContentError> {
        self.reader
            .find_review_video(id)
            .await?
            .ok_or(AdminContentError::NotFound {
                entity: "review video",
            })
    }

    pub async fn create_review_video(
        &self,
        command: ReviewVideoCommand,
    ) -> Result<ReviewVideoRecord, AdminContentError> {
        let params = review_video_params(command)?;
        let record = self.writer.create_review_video(params).await?;
        self.written("review_video.create", record.id);
        Ok(record)
    }

    pub async fn update_review_video(
        &self,
        id: Uuid,
        command: ReviewVideoCommand,
    ) -> Result<ReviewVideoRecord, AdminContentError> {
        let params = review_video_params(command)?;
        let record = self.writer.update_review_video(id, params).await?;
        self.written("review_video.update", id);
        Ok(record)
    }

    pub async fn delete_review_video(&self, id: Uuid) -> Result<(), AdminContentError> {
        self.writer.delete_review_video(id).await?;
        self.written("review_video.delete", id);
        Ok(())
    }

    async fn featured_params(
        &self,
        command: FeaturedItemCommand,
    ) -> Result<FeaturedItemParams, AdminContentError> {
        if self
            .catalog
            .find_product_by_id(command.product_id)
            .await?
            .is_none()
        {
            return Err(violation("product_id"));
        }

        Ok(FeaturedItemParams {
            product_id: command.product_id,
            label: optional(command.label),
            visible: command.visible,
            sort_order: command.sort_order,
        })
    }

    fn written(&self, action: &'static str, id: Uuid) {
        self.cache.invalidate_all();
        info!(target = "florette::admin", action, %id, "content updated");
    }
}

fn testimonial_params(command: TestimonialCommand) -> Result<TestimonialParams, AdminContentError> {
    if !(1..=5).contains(&command.rating) {
        return Err(violation("rating"));
    }

    Ok(TestimonialParams {
        author_name: required(&command.author_name, "author_name").map_err(violation)?,
        author_title: optional(command.author_title),
        quote: required(&command.quote, "quote").map_err(violation)?,
        rating: command.rating,
        avatar_url: optional(command.avatar_url),
        visible: command.visible,
        sort_order: command.sort_order,
    })
}

fn banner_params(command: BannerCommand) -> Result<BannerParams, AdminContentError> {
    Ok(BannerParams {
        title: required(&command.title, "title").map_err(violation)?,
        subtitle: optional(command.subtitle),
        image_url: required(&command.image_url, "image_url").map_err(violation)?,
        link_url: optional(command.link_url),
        visible: command.visible,
        sort_order: command.sort_order,
    })
}

fn announcement_params(
    command: AnnouncementCommand,
) -> Result<AnnouncementParams, AdminContentError> {
    if let (Some(starts_at), Some(ends_at)) = (command.starts_at, command.ends_at) {
        if starts_at >= ends_at {
            return Err(violation("ends_at"));
        }
    }

    Ok(AnnouncementParams {
        message: required(&command.message, "message").map_err(violation)?,
        link_url: optional(command.link_url),
        starts_at: command.starts_at,
        ends_at: command.ends_at,
        visible: command.visible,
        sort_order: command.sort_order,
    })
}

fn review_video_params(
    command: ReviewVideoCommand,
) -> Result<ReviewVideoParams, AdminContentError> {
    Ok(ReviewVideoParams {
        title: required(&command.title, "title").map_err(violation)?,
        video_url: required(&command.video_url, "video_url").map_err(violation)?,
        thumbnail_url: optional(command.thumbnail_url),
        visible: command.visible,
        sort_order: command.sort_order,
    })
}
