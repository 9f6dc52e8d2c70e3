//! Application services layer.

pub mod admin;
pub mod auth;
pub mod error;
pub mod ordering;
pub mod repos;
pub mod storefront;
pub mod uploads;
