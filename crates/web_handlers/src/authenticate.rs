use std::future::{Ready, ready};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
    web,
};

use auth_services::Identity;
use session_services::{FlashKind, SessionExt};

use crate::app::AppState;
use crate::error::AppError;

/// The user resolved by the authenticate stage, `None` when anonymous.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .cloned()
                .ok_or(AppError::Pipeline("authenticate stage did not run")),
        )
    }
}

/// Authenticate stage: resolves the session's identity reference.
///
/// A reference to a user that no longer exists resolves to anonymous.
pub async fn authenticate<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(session) = req.get_session() else {
        let error = AppError::Pipeline("authenticate stage needs the session stage");
        return Ok(req.error_response(error).map_into_right_body());
    };
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        let error = AppError::Pipeline("application state is not registered");
        return Ok(req.error_response(error).map_into_right_body());
    };

    let identity = match session.user() {
        Some(user_id) => state.auth.deserialize(user_id).await,
        None => None,
    };
    req.extensions_mut().insert(CurrentUser(identity));

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}

/// Extractor for routes only signed-in users may visit.
///
/// Anonymous visitors get the error flash "You must be signed in first!" and
/// are redirected to `/login`; for `GET` requests the original address is
/// remembered so logging in sends them back.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Identity);

impl FromRequest for RequireUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let current = req.extensions().get::<CurrentUser>().cloned();

        let result = match current {
            Some(CurrentUser(Some(identity))) => Ok(RequireUser(identity)),
            Some(CurrentUser(None)) => match req.get_session() {
                Some(session) => {
                    if req.method() == Method::GET {
                        session.set_return_to(req.uri().to_string());
                    }
                    session.push_flash(FlashKind::Error, AppError::LoginRequired.to_string());
                    Err(AppError::LoginRequired)
                }
                None => Err(AppError::Pipeline("login check needs the session stage")),
            },
            None => Err(AppError::Pipeline("authenticate stage did not run")),
        };

        ready(result)
    }
}
