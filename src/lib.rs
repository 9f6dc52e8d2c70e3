//! Florette: florist storefront API, WhatsApp ordering, and an authenticated back office.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
