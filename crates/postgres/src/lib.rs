//! # Postgres
//!
//! This crate owns the connection pool and schema for the Yelp Camp database.

/// Connection pool, connectivity check and migrations.
pub mod database;
