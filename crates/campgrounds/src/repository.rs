use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::*;

/// Storage for campgrounds and their reviews
#[async_trait]
pub trait CampgroundRepository: Send + Sync {
    /// Lists every campground, newest first
    async fn list(&self) -> Result<Vec<Campground>, CampgroundError>;

    /// Gets a campground by id
    async fn find(&self, id: &Uuid) -> Result<Option<Campground>, CampgroundError>;

    /// Creates a campground owned by `author_id`
    async fn create(
        &self,
        author_id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Campground, CampgroundError>;

    /// Replaces the editable fields of a campground
    async fn update(
        &self,
        id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Option<Campground>, CampgroundError>;

    /// Deletes a campground and its reviews, returning whether it existed
    async fn delete(&self, id: &Uuid) -> Result<bool, CampgroundError>;

    /// Lists the reviews of a campground, oldest first
    async fn reviews_for(&self, campground_id: &Uuid) -> Result<Vec<Review>, CampgroundError>;

    /// Adds a review to a campground
    async fn add_review(
        &self,
        campground_id: &Uuid,
        author_id: &Uuid,
        form: &ReviewForm,
    ) -> Result<Review, CampgroundError>;

    /// Gets a review by id
    async fn find_review(&self, review_id: &Uuid) -> Result<Option<Review>, CampgroundError>;

    /// Deletes a review, returning whether it existed
    async fn delete_review(&self, review_id: &Uuid) -> Result<bool, CampgroundError>;
}

/// Campground repository backed by the `campgrounds` and `reviews` tables
#[derive(Clone)]
pub struct PgCampgroundRepository {
    pool: PgPool,
}

impl PgCampgroundRepository {
    /// Creates a new instance of `PgCampgroundRepository` with the provided database connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CAMPGROUND_COLUMNS: &str = r#"
    c.id, c.title, c.location, c.description, c.price, c.image,
    c.author_id, u.username AS author_username, c.created_at
"#;

const REVIEW_COLUMNS: &str = r#"
    r.id, r.campground_id, r.author_id, u.username AS author_username,
    r.body, r.rating, r.created_at
"#;

#[async_trait]
impl CampgroundRepository for PgCampgroundRepository {
    async fn list(&self) -> Result<Vec<Campground>, CampgroundError> {
        let sql = format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds c JOIN users u ON u.id = c.author_id ORDER BY c.created_at DESC"
        );
        let campgrounds = sqlx::query_as::<_, Campground>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(campgrounds)
    }

    async fn find(&self, id: &Uuid) -> Result<Option<Campground>, CampgroundError> {
        let sql = format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds c JOIN users u ON u.id = c.author_id WHERE c.id = $1"
        );
        let campground = sqlx::query_as::<_, Campground>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(campground)
    }

    async fn create(
        &self,
        author_id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Campground, CampgroundError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO campgrounds (title, location, description, price, image, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(form.title.trim())
        .bind(form.location.trim())
        .bind(&form.description)
        .bind(form.price)
        .bind(form.image.trim())
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        self.find(&id)
            .await?
            .ok_or(CampgroundError::Database(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Option<Campground>, CampgroundError> {
        let result = sqlx::query(
            r#"
            UPDATE campgrounds
            SET title = $1,
                location = $2,
                description = $3,
                price = $4,
                image = $5
            WHERE id = $6
            "#,
        )
        .bind(form.title.trim())
        .bind(form.location.trim())
        .bind(&form.description)
        .bind(form.price)
        .bind(form.image.trim())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find(id).await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, CampgroundError> {
        // Reviews go with the campground through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reviews_for(&self, campground_id: &Uuid) -> Result<Vec<Review>, CampgroundError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.campground_id = $1 ORDER BY r.created_at"
        );
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(campground_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reviews)
    }

    async fn add_review(
        &self,
        campground_id: &Uuid,
        author_id: &Uuid,
        form: &ReviewForm,
    ) -> Result<Review, CampgroundError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (campground_id, author_id, body, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(campground_id)
        .bind(author_id)
        .bind(form.body.trim())
        .bind(form.rating)
        .fetch_one(&self.pool)
        .await?;

        self.find_review(&id)
            .await?
            .ok_or(CampgroundError::Database(sqlx::Error::RowNotFound))
    }

    async fn find_review(&self, review_id: &Uuid) -> Result<Option<Review>, CampgroundError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r JOIN users u ON u.id = r.author_id WHERE r.id = $1"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(review)
    }

    async fn delete_review(&self, review_id: &Uuid) -> Result<bool, CampgroundError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Campground repository kept in process memory, for tests and local development.
///
/// Author usernames are recorded when the author first creates something.
#[derive(Default)]
pub struct MemoryCampgroundRepository {
    inner: Mutex<MemoryCampgrounds>,
}

#[derive(Default)]
struct MemoryCampgrounds {
    campgrounds: Vec<Campground>,
    reviews: Vec<Review>,
    usernames: Vec<(Uuid, String)>,
}

impl MemoryCampgrounds {
    fn username(&self, id: &Uuid) -> String {
        self.usernames
            .iter()
            .find(|(user_id, _)| user_id == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }
}

impl MemoryCampgroundRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the display name used for `user_id` as an author.
    pub fn register_author(&self, user_id: Uuid, username: impl Into<String>) {
        self.lock().usernames.push((user_id, username.into()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCampgrounds> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CampgroundRepository for MemoryCampgroundRepository {
    async fn list(&self) -> Result<Vec<Campground>, CampgroundError> {
        let mut campgrounds = self.lock().campgrounds.clone();
        campgrounds.reverse();
        Ok(campgrounds)
    }

    async fn find(&self, id: &Uuid) -> Result<Option<Campground>, CampgroundError> {
        Ok(self.lock().campgrounds.iter().find(|c| c.id == *id).cloned())
    }

    async fn create(
        &self,
        author_id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Campground, CampgroundError> {
        let mut inner = self.lock();
        let campground = Campground {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            location: form.location.trim().to_string(),
            description: form.description.clone(),
            price: form.price,
            image: form.image.trim().to_string(),
            author_id: *author_id,
            author_username: inner.username(author_id),
            created_at: Utc::now(),
        };
        inner.campgrounds.push(campground.clone());
        Ok(campground)
    }

    async fn update(
        &self,
        id: &Uuid,
        form: &CampgroundForm,
    ) -> Result<Option<Campground>, CampgroundError> {
        let mut inner = self.lock();
        let Some(campground) = inner.campgrounds.iter_mut().find(|c| c.id == *id) else {
            return Ok(None);
        };

        campground.title = form.title.trim().to_string();
        campground.location = form.location.trim().to_string();
        campground.description = form.description.clone();
        campground.price = form.price;
        campground.image = form.image.trim().to_string();
        Ok(Some(campground.clone()))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, CampgroundError> {
        let mut inner = self.lock();
        let before = inner.campgrounds.len();
        inner.campgrounds.retain(|c| c.id != *id);
        inner.reviews.retain(|r| r.campground_id != *id);
        Ok(inner.campgrounds.len() < before)
    }

    async fn reviews_for(&self, campground_id: &Uuid) -> Result<Vec<Review>, CampgroundError> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.campground_id == *campground_id)
            .cloned()
            .collect())
    }

    async fn add_review(
        &self,
        campground_id: &Uuid,
        author_id: &Uuid,
        form: &ReviewForm,
    ) -> Result<Review, CampgroundError> {
        let mut inner = self.lock();
        let review = Review {
            id: Uuid::new_v4(),
            campground_id: *campground_id,
            author_id: *author_id,
            author_username: inner.username(author_id),
            body: form.body.trim().to_string(),
            rating: form.rating,
            created_at: Utc::now(),
        };
        inner.reviews.push(review.clone());
        Ok(review)
    }

    async fn find_review(&self, review_id: &Uuid) -> Result<Option<Review>, CampgroundError> {
        Ok(self.lock().reviews.iter().find(|r| r.id == *review_id).cloned())
    }

    async fn delete_review(&self, review_id: &Uuid) -> Result<bool, CampgroundError> {
        let mut inner = self.lock();
        let before = inner.reviews.len();
        inner.reviews.retain(|r| r.id != *review_id);
        Ok(inner.reviews.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str) -> CampgroundForm {
        CampgroundForm {
            title: title.to_string(),
            location: "Moab, UT".to_string(),
            description: "Red rock views".to_string(),
            price: 25.0,
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn test_memory_repository_crud() {
        let repo = MemoryCampgroundRepository::new();
        let author = Uuid::new_v4();
        repo.register_author(author, "colt");

        let created = repo.create(&author, &form(" Slickrock ")).await.unwrap();
        assert_eq!(created.title, "Slickrock");
        assert_eq!(created.author_username, "colt");

        let updated = repo
            .update(&created.id, &form("Slickrock North"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Slickrock North");

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.delete(&created.id).await.unwrap());
        assert!(!repo.delete(&created.id).await.unwrap());
        assert!(repo.find(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_campground_drops_reviews() {
        let repo = MemoryCampgroundRepository::new();
        let author = Uuid::new_v4();
        let campground = repo.create(&author, &form("Arches")).await.unwrap();

        let review = repo
            .add_review(
                &campground.id,
                &author,
                &ReviewForm {
                    body: "Windy".to_string(),
                    rating: 4,
                },
            )
            .await
            .unwrap();
        assert_eq!(repo.reviews_for(&campground.id).await.unwrap().len(), 1);

        repo.delete(&campground.id).await.unwrap();
        assert!(repo.find_review(&review.id).await.unwrap().is_none());
    }
}
