//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod fallback;
pub mod ordering;
pub mod slug;
pub mod types;
