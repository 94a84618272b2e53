//! # Web Handlers for the Yelp Camp Web Application
//!
//! This crate provides the request pipeline and route handlers for Yelp Camp.
//! Every request passes through the stages described by [`Pipeline::standard`],
//! and [`build_app`] wires them in that order.

/// Application state and wiring of the pipeline stages
mod app;
pub use app::*;

/// Authenticate stage and the login-required extractor
mod authenticate;
pub use authenticate::*;

/// Flash and context stages
mod context;
pub use context::*;

/// Error type forwarded to the terminal error stage
mod error;
pub use error::*;

/// Not-found fallback and terminal error rendering
mod error_page;
pub use error_page::*;

/// Ordered pipeline stages and their validation
mod pipeline;
pub use pipeline::*;

/// Key sanitization stage
pub mod sanitize;

/// Security headers stage
pub mod security;

/// HTML pages
pub mod views;

/// Registration, login and logout
pub mod auth_handlers;

/// Campground pages and changes
pub mod campground_handlers;

/// Review changes
pub mod review_handlers;
