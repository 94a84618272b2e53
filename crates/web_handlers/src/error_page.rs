use actix_web::{
    HttpMessage, HttpResponse, Result,
    body::{BoxBody, EitherBody},
    dev::ServiceResponse,
    http::header::{CONTENT_TYPE, HeaderValue},
    middleware::{ErrorHandlerResponse, ErrorHandlers},
};

use crate::context::RequestContext;
use crate::error::{AppError, GENERIC_ERROR_MESSAGE, NOT_FOUND_MESSAGE};
use crate::views;

/// Not-found stage: answers every request no route claimed.
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))
}

fn public_message<B>(res: &ServiceResponse<B>) -> String {
    let status = res.status();
    let from_error = res.response().error().and_then(|error| {
        match error.as_error::<AppError>() {
            Some(app_error) => app_error.public_message(),
            None if status.is_client_error() => Some(error.to_string()),
            None => None,
        }
    });

    match from_error {
        Some(message) if !message.trim().is_empty() => message,
        _ if status.as_u16() == 404 => NOT_FOUND_MESSAGE.to_string(),
        _ if status.is_client_error() => status
            .canonical_reason()
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string(),
        _ => GENERIC_ERROR_MESSAGE.to_string(),
    }
}

/// Terminal error stage: renders every 4xx/5xx response as the error page.
///
/// The status comes from the forwarded error (500 when it carries none); the
/// message is shown only when the error marks it public, otherwise
/// [`GENERIC_ERROR_MESSAGE`]. Headers already set, such as `Set-Cookie` from
/// the session stage, are kept.
pub fn render_error<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let message = public_message(&res);

    if status.is_server_error() {
        match res.response().error() {
            Some(error) => log::error!(
                "❌ {} {} failed with {}: {}",
                res.request().method(),
                res.request().path(),
                status,
                error
            ),
            None => log::error!(
                "❌ {} {} failed with {}",
                res.request().method(),
                res.request().path(),
                status
            ),
        }
    }

    let context = res
        .request()
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let page = views::error_page(&context, status, &message);

    let res = res.map_body(|head, _| {
        head.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        EitherBody::right(BoxBody::new(page))
    });

    Ok(ErrorHandlerResponse::Response(res))
}

/// Middleware running [`render_error`] for every error status.
pub fn error_handlers<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().default_handler(render_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        App, HttpResponse, body::to_bytes, http::StatusCode, test, web,
    };
    use campgrounds::CampgroundError;

    async fn failing() -> Result<HttpResponse, AppError> {
        Err(AppError::Campground(CampgroundError::Database(
            sqlx::Error::PoolTimedOut,
        )))
    }

    async fn rejected() -> Result<HttpResponse, AppError> {
        Err(AppError::BadRequest("Title is required".to_string()))
    }

    async fn teapot() -> HttpResponse {
        HttpResponse::build(StatusCode::IM_A_TEAPOT).body("short and stout")
    }

    #[actix_web::test]
    async fn test_error_page_rendering() {
        let app = test::init_service(
            App::new()
                .route("/fail", web::get().to(failing))
                .route("/reject", web::get().to(rejected))
                .route("/teapot", web::get().to(teapot))
                .default_service(web::to(not_found))
                .wrap(error_handlers()),
        )
        .await;

        let cases = [
            ("/fail", StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE),
            ("/reject", StatusCode::BAD_REQUEST, "Title is required"),
            ("/teapot", StatusCode::IM_A_TEAPOT, "I&#39;m a teapot"),
            ("/nowhere", StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        ];

        for (path, status, message) in cases {
            let req = test::TestRequest::get().uri(path).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), status, "{path}");
            assert_eq!(
                res.headers().get(CONTENT_TYPE).unwrap(),
                "text/html; charset=utf-8"
            );

            let body = to_bytes(res.into_body()).await.unwrap();
            let body = String::from_utf8(body.to_vec()).unwrap();
            assert!(body.contains(message), "{path}: {body}");
            assert!(!body.contains("PoolTimedOut"));
            assert!(!body.contains("pool timed out"));
        }
    }
}
