use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Form submitted to create or edit a campground
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CampgroundForm {
    /// Display name of the campground
    #[validate(
        length(max = 120, message = "Title is too long"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: String,

    /// Free-form location, e.g. "Yosemite, CA"
    #[validate(
        length(max = 120, message = "Location is too long"),
        custom(function = "not_blank", message = "Location is required")
    )]
    pub location: String,

    /// Description shown on the campground page
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub description: String,

    /// Price per night
    #[validate(custom(function = "validate_price", message = "Price must be zero or more"))]
    pub price: f64,

    /// Image URL
    #[serde(default)]
    #[validate(length(max = 2048, message = "Image URL is too long"))]
    pub image: String,
}

/// Form submitted to review a campground
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewForm {
    /// Review text
    #[validate(custom(function = "not_blank", message = "Review text is required"))]
    pub body: String,

    /// Rating from 1 to 5
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
}

/// Campground as stored in the database, with its author's username
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Campground {
    /// Unique identifier for the campground
    pub id: Uuid,
    /// Display name
    pub title: String,
    /// Free-form location
    pub location: String,
    /// Description
    pub description: String,
    /// Price per night
    pub price: f64,
    /// Image URL, possibly empty
    pub image: String,
    /// User who created the campground
    pub author_id: Uuid,
    /// Username of the author
    pub author_username: String,
    /// When the campground was created
    pub created_at: DateTime<Utc>,
}

/// Review as stored in the database, with its author's username
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    /// Unique identifier for the review
    pub id: Uuid,
    /// Campground the review belongs to
    pub campground_id: Uuid,
    /// User who wrote the review
    pub author_id: Uuid,
    /// Username of the author
    pub author_username: String,
    /// Review text
    pub body: String,
    /// Rating from 1 to 5
    pub rating: i32,
    /// When the review was written
    pub created_at: DateTime<Utc>,
}

/// Errors raised by campground operations
#[derive(Debug, thiserror::Error)]
pub enum CampgroundError {
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An error occurred while validating input data
    #[error("{0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for CampgroundError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CampgroundError::Validation(format!("Validation error: {}", errors))
    }
}

/// Rejects values made only of whitespace; they are stored trimmed.
fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

/// Custom validation for prices: finite and not negative
fn validate_price(price: f64) -> Result<(), validator::ValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_price"))
    }
}
