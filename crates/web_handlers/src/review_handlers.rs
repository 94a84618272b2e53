use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;
use validator::Validate;

use campgrounds::{CampgroundError, ReviewForm};

use crate::app::AppState;
use crate::authenticate::RequireUser;
use crate::campground_handlers::{CAMPGROUND_NOT_FOUND, NO_PERMISSION};
use crate::context::Flash;
use crate::error::AppError;
use crate::views::redirect;

/// Adds a review to a campground.
pub async fn create(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    path: web::Path<Uuid>,
    form: web::Form<ReviewForm>,
) -> Result<HttpResponse, AppError> {
    let campground_id = path.into_inner();
    if state.campgrounds.find(&campground_id).await?.is_none() {
        flash.error(CAMPGROUND_NOT_FOUND);
        return Ok(redirect("/campgrounds"));
    }

    form.validate().map_err(CampgroundError::from)?;

    state
        .campgrounds
        .add_review(&campground_id, &user.id, &form)
        .await?;

    flash.success("Created new review!");
    Ok(redirect(&format!("/campgrounds/{}", campground_id)))
}

/// Deletes a review, for its author only.
pub async fn delete(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (campground_id, review_id) = path.into_inner();
    let campground_page = format!("/campgrounds/{}", campground_id);

    let review = state
        .campgrounds
        .find_review(&review_id)
        .await?
        .filter(|review| review.campground_id == campground_id);
    let Some(review) = review else {
        flash.error("Cannot find that review!");
        return Ok(redirect(&campground_page));
    };

    if review.author_id != user.id {
        flash.error(NO_PERMISSION);
        return Ok(redirect(&campground_page));
    }

    state.campgrounds.delete_review(&review_id).await?;

    flash.success("Successfully deleted review");
    Ok(redirect(&campground_page))
}
