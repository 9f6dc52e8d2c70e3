//! Application services for the administrative surface.
//!
//! Every write goes straight to the store and then drops the storefront cache
//! so the next public read refetches.

pub mod catalog;
pub mod content;
pub mod settings;
pub mod taxonomy;

use std::future::Future;

use crate::application::repos::RepoError;
use crate::domain::slug::{SlugAsyncError, SlugError, derive_slug, generate_unique_slug_async};

pub use catalog::{AdminCatalogError, AdminCatalogService};
pub use content::{AdminContentError, AdminContentService};
pub use settings::{AdminSettingsError, AdminSettingsService};
pub use taxonomy::{AdminTaxonomyError, AdminTaxonomyService};

pub(crate) fn default_visible() -> bool {
    true
}

/// Trim a required text field, naming the field when it is blank.
pub(crate) fn required(value: &str, field: &'static str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(field)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trim an optional text field; blank values become `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[derive(Debug)]
pub(crate) enum SlugFailure {
    Field(&'static str),
    Repo(RepoError),
}

/// Slug for a new record: the explicit one when given (uniqueness is left to the
/// store's constraint), otherwise derived from `name` and suffixed until unique.
pub(crate) async fn slug_for_create<F, Fut>(
    explicit: Option<&str>,
    name: &str,
    is_unique: F,
) -> Result<String, SlugFailure>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, RepoError>>,
{
    if let Some(explicit) = explicit.map(str::trim).filter(|value| !value.is_empty()) {
        return derive_slug(explicit).map_err(|_| SlugFailure::Field("slug"));
    }

    match generate_unique_slug_async(name, is_unique).await {
        Ok(slug) => Ok(slug),
        Err(SlugAsyncError::Slug(SlugError::EmptyInput | SlugError::Unrepresentable { .. })) => {
            Err(SlugFailure::Field("name"))
        }
        Err(SlugAsyncError::Slug(SlugError::Exhausted { .. })) => Err(SlugFailure::Field("slug")),
        Err(SlugAsyncError::Predicate(err)) => Err(SlugFailure::Repo(err)),
    }
}

/// Slug for an update: existing slugs are stable unless a new one is given.
pub(crate) fn slug_for_update(explicit: Option<&str>, existing: &str) -> Result<String, SlugFailure> {
    match explicit.map(str::trim).filter(|value| !value.is_empty()) {
        Some(explicit) => derive_slug(explicit).map_err(|_| SlugFailure::Field("slug")),
        None => Ok(existing.to_string()),
    }
}
