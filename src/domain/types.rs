//! Shared domain enumerations.

use serde::{Deserialize, Serialize};

/// The two gift-finder taxonomies. Both live in their own table with identical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    Celebration,
    Relationship,
}

impl TaxonomyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaxonomyKind::Celebration => "celebration",
            TaxonomyKind::Relationship => "relationship",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            TaxonomyKind::Celebration => "celebrations",
            TaxonomyKind::Relationship => "relationships",
        }
    }

    /// Join table linking products to this taxonomy.
    pub fn link_table(self) -> &'static str {
        match self {
            TaxonomyKind::Celebration => "product_celebrations",
            TaxonomyKind::Relationship => "product_relationships",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            TaxonomyKind::Celebration => "celebration_id",
            TaxonomyKind::Relationship => "relationship_id",
        }
    }
}

/// Which audience a read is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListScope {
    /// Storefront reads: only visible records.
    Public,
    /// Back-office reads: everything, hidden records included.
    Admin,
}

impl ListScope {
    pub fn is_public(self) -> bool {
        matches!(self, ListScope::Public)
    }
}

/// Outcome of the best-effort publish step that follows a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    /// No publisher is configured; the file is stored locally only.
    Disabled,
    /// The file was committed and pushed.
    Published { commit: Option<String> },
    /// Stored locally, but publishing failed.
    Failed { reason: String },
}

impl PublishStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishStatus::Published { .. })
    }
}
