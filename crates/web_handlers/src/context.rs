use std::future::{Ready, ready};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
};

use auth_services::Identity;
use session_services::{FlashKind, Session, SessionExt};

use crate::authenticate::CurrentUser;
use crate::error::AppError;

/// Handle for queueing flash messages from a handler.
#[derive(Clone)]
pub struct Flash(Session);

impl Flash {
    /// Queues a message for the green banner.
    pub fn success(&self, message: impl Into<String>) {
        self.0.push_flash(FlashKind::Success, message);
    }

    /// Queues a message for the red banner.
    pub fn error(&self, message: impl Into<String>) {
        self.0.push_flash(FlashKind::Error, message);
    }
}

impl FromRequest for Flash {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Flash>()
                .cloned()
                .ok_or(AppError::Pipeline("flash stage did not run")),
        )
    }
}

/// Flash stage: binds the [`Flash`] handle to the request's session.
pub async fn bind_flash<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let Some(session) = req.get_session() else {
        let error = AppError::Pipeline("flash stage needs the session stage");
        return Ok(req.error_response(error).map_into_right_body());
    };
    req.extensions_mut().insert(Flash(session));

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}

/// Everything a page needs besides its own data: who is signed in and the
/// flash messages queued by the previous request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// The signed-in user, if any
    pub current_user: Option<Identity>,
    /// Success banners to show
    pub success: Vec<String>,
    /// Error banners to show
    pub error: Vec<String>,
}

impl FromRequest for RequestContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestContext>()
                .cloned()
                .ok_or(AppError::Pipeline("context stage did not run")),
        )
    }
}

/// Context stage: drains the flash queues into a [`RequestContext`].
///
/// Messages are consumed here whether or not the handler renders a page, so
/// each one reaches exactly one request.
pub async fn bind_context<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let current_user = req.extensions().get::<CurrentUser>().cloned();
    let Some(CurrentUser(current_user)) = current_user else {
        let error = AppError::Pipeline("context stage needs the authenticate stage");
        return Ok(req.error_response(error).map_into_right_body());
    };
    let flash = req.extensions().get::<Flash>().cloned();
    let Some(Flash(session)) = flash else {
        let error = AppError::Pipeline("context stage needs the flash stage");
        return Ok(req.error_response(error).map_into_right_body());
    };

    let mut pending = session.drain_flash();
    let context = RequestContext {
        current_user,
        success: pending.remove(&FlashKind::Success).unwrap_or_default(),
        error: pending.remove(&FlashKind::Error).unwrap_or_default(),
    };
    req.extensions_mut().insert(context);

    next.call(req)
        .await
        .map(ServiceResponse::map_into_left_body)
}
