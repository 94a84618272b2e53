use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;
use validator::Validate;

use auth_services::Identity;
use campgrounds::{Campground, CampgroundError, CampgroundForm};

use crate::app::AppState;
use crate::authenticate::RequireUser;
use crate::context::{Flash, RequestContext};
use crate::error::AppError;
use crate::views::{self, redirect};

pub(crate) const CAMPGROUND_NOT_FOUND: &str = "Cannot find that campground!";
pub(crate) const NO_PERMISSION: &str = "You do not have permission to do that!";

/// Looks up a campground the user wants to change.
///
/// The inner `Err` is the redirect to send instead, with the reason already
/// flashed: the campground is gone, or the user is not its author.
pub(crate) async fn find_owned(
    state: &AppState,
    id: &Uuid,
    user: &Identity,
    flash: &Flash,
) -> Result<Result<Campground, HttpResponse>, AppError> {
    let Some(campground) = state.campgrounds.find(id).await? else {
        flash.error(CAMPGROUND_NOT_FOUND);
        return Ok(Err(redirect("/campgrounds")));
    };

    if campground.author_id != user.id {
        log::warn!("{} tried to change campground {}", user.username, id);
        flash.error(NO_PERMISSION);
        return Ok(Err(redirect(&format!("/campgrounds/{}", id))));
    }

    Ok(Ok(campground))
}

/// Lists all campgrounds.
pub async fn index(
    state: web::Data<AppState>,
    ctx: RequestContext,
) -> Result<HttpResponse, AppError> {
    let campgrounds = state.campgrounds.list().await?;
    Ok(views::html(views::campground_index(&ctx, &campgrounds)))
}

/// Renders the new campground form.
pub async fn new_form(_user: RequireUser, ctx: RequestContext) -> HttpResponse {
    views::html(views::campground_new(&ctx))
}

/// Creates a campground owned by the current user.
pub async fn create(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    form: web::Form<CampgroundForm>,
) -> Result<HttpResponse, AppError> {
    form.validate().map_err(CampgroundError::from)?;

    let campground = state.campgrounds.create(&user.id, &form).await?;
    log::info!("🏕️ {} created campground {}", user.username, campground.id);

    flash.success("Successfully made a new campground!");
    Ok(redirect(&format!("/campgrounds/{}", campground.id)))
}

/// Shows a campground and its reviews.
pub async fn show(
    state: web::Data<AppState>,
    ctx: RequestContext,
    flash: Flash,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let Some(campground) = state.campgrounds.find(&id).await? else {
        flash.error(CAMPGROUND_NOT_FOUND);
        return Ok(redirect("/campgrounds"));
    };

    let reviews = state.campgrounds.reviews_for(&id).await?;
    Ok(views::html(views::campground_show(
        &ctx,
        &campground,
        &reviews,
    )))
}

/// Renders the edit form, for the author only.
pub async fn edit_form(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    ctx: RequestContext,
    flash: Flash,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    match find_owned(&state, &path, &user, &flash).await? {
        Ok(campground) => Ok(views::html(views::campground_edit(&ctx, &campground))),
        Err(response) => Ok(response),
    }
}

/// Saves edits, for the author only.
pub async fn update(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    path: web::Path<Uuid>,
    form: web::Form<CampgroundForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if let Err(response) = find_owned(&state, &id, &user, &flash).await? {
        return Ok(response);
    }

    form.validate().map_err(CampgroundError::from)?;

    if state.campgrounds.update(&id, &form).await?.is_none() {
        flash.error(CAMPGROUND_NOT_FOUND);
        return Ok(redirect("/campgrounds"));
    }

    flash.success("Successfully updated campground!");
    Ok(redirect(&format!("/campgrounds/{}", id)))
}

/// Deletes a campground and its reviews, for the author only.
pub async fn delete(
    state: web::Data<AppState>,
    RequireUser(user): RequireUser,
    flash: Flash,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    if let Err(response) = find_owned(&state, &id, &user, &flash).await? {
        return Ok(response);
    }

    state.campgrounds.delete(&id).await?;
    log::info!("🗑️ {} deleted campground {}", user.username, id);

    flash.success("Successfully deleted campground");
    Ok(redirect("/campgrounds"))
}
