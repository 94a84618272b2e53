//! # Campgrounds
//!
//! This crate provides the campground and review records listed on the site,
//! the forms used to create them, and their persistence.

/// Types for campgrounds and reviews
mod types;
pub use types::*;

/// Repository trait with Postgres and in-memory implementations
mod repository;
pub use repository::*;
