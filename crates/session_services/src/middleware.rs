use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::{DateTime, Utc};
use futures_util::future::LocalBoxFuture;

use crate::cookie::CookieSigner;
use crate::session::{Session, SessionOutcome};
use crate::store::SessionStore;
use crate::types::{SessionConfig, SessionError, SessionId, SessionRecord, SessionState};

/// Middleware binding a [`Session`] to every request.
///
/// Before the inner service runs it verifies the signed `session` cookie and
/// loads the record; afterwards it writes back only what changed:
///
/// - a renewed session (login/logout) is saved under a new id, then the old
///   record is destroyed;
/// - a modified session is saved and its cookie re-issued;
/// - an unchanged session is touched once it is older than `touch_after`;
/// - a brand-new session is saved when `save_uninitialized` is set.
///
/// Store failures are forwarded as error responses, never raised past the
/// middleware.
pub struct SessionMiddleware {
    inner: Rc<SessionMiddlewareInner>,
}

struct SessionMiddlewareInner {
    store: Arc<dyn SessionStore>,
    signer: CookieSigner,
    config: SessionConfig,
}

impl SessionMiddleware {
    /// Creates the middleware over `store`, signing cookies with `secret`.
    pub fn new(store: Arc<dyn SessionStore>, secret: &[u8], config: SessionConfig) -> Self {
        Self {
            inner: Rc::new(SessionMiddlewareInner {
                store,
                signer: CookieSigner::new(secret),
                config,
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            inner: Rc::clone(&self.inner),
        }))
    }
}

/// Service that implements the session middleware logic
pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    inner: Rc<SessionMiddlewareInner>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let inner = Rc::clone(&self.inner);

        Box::pin(async move {
            let now = Utc::now();

            let previous = match inner.load(&req, now).await {
                Ok(previous) => previous,
                Err(e) => {
                    log::error!("❌ Failed to load session: {}", e);
                    return Ok(req.error_response(e).map_into_right_body());
                }
            };

            let (session, initial, previous) = match previous {
                Some((id, record)) => {
                    let initial = record.state.clone();
                    (Session::new(Some(id), record.state.clone()), initial, Some(record))
                }
                None => (
                    Session::new(None, SessionState::default()),
                    SessionState::default(),
                    None,
                ),
            };

            req.extensions_mut().insert(session.clone());

            let mut res = service.call(req).await?;

            match inner
                .persist(session.outcome(), &initial, previous.as_ref(), &mut res, now)
                .await
            {
                Ok(()) => Ok(res.map_into_left_body()),
                Err(e) => {
                    log::error!("❌ Failed to persist session: {}", e);
                    Ok(res.error_response(e).map_into_right_body())
                }
            }
        })
    }
}

impl SessionMiddlewareInner {
    async fn load(
        &self,
        req: &ServiceRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<(SessionId, SessionRecord)>, SessionError> {
        let Some(cookie) = req.cookie(&self.config.cookie_name) else {
            return Ok(None);
        };

        let Some(id) = self.signer.verify(cookie.value()) else {
            log::debug!("Ignoring session cookie with an invalid signature");
            return Ok(None);
        };

        match self.store.load(&id).await? {
            Some(record) if !record.is_expired(now) => Ok(Some((id, record))),
            _ => Ok(None),
        }
    }

    async fn persist<B>(
        &self,
        outcome: SessionOutcome,
        initial: &SessionState,
        previous: Option<&SessionRecord>,
        res: &mut ServiceResponse<B>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let SessionOutcome { id, state, renewed } = outcome;
        let changed = state != *initial;

        let mut replaced = None;
        let target = match id {
            Some(id) if renewed => {
                log::debug!("Session renewed under a new id");
                replaced = Some(id);
                Some(SessionId::generate())
            }
            Some(id) if changed => Some(id),
            Some(id) => {
                if previous.is_some_and(|record| record.needs_touch(self.config.touch_after, now)) {
                    self.store
                        .touch(&id, now + self.config.max_age, now)
                        .await?;
                    self.set_cookie(res, &id)?;
                }
                None
            }
            None if renewed || changed || self.config.save_uninitialized => {
                log::debug!("Creating new session");
                Some(SessionId::generate())
            }
            None => None,
        };

        if let Some(id) = target {
            let record = SessionRecord::new(state, self.config.max_age, now);
            self.store.save(&id, &record).await?;
            self.set_cookie(res, &id)?;
        }

        // The old id is only dropped once its replacement is stored.
        if let Some(old) = replaced {
            self.store.destroy(&old).await?;
        }

        Ok(())
    }

    fn set_cookie<B>(
        &self,
        res: &mut ServiceResponse<B>,
        id: &SessionId,
    ) -> Result<(), SessionError> {
        let cookie = Cookie::build(self.config.cookie_name.clone(), self.signer.sign(id)?)
            .path("/")
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.config.max_age.num_seconds()))
            .finish();

        res.response_mut().add_cookie(&cookie)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::FlashKind;
    use crate::store::MemorySessionStore;
    use actix_web::{App, HttpResponse, test, web};
    use chrono::Duration;

    const SECRET: &[u8] = b"test-secret";

    async fn push(session: Session) -> HttpResponse {
        session.push_flash(FlashKind::Success, "x");
        HttpResponse::Ok().finish()
    }

    async fn drain(session: Session) -> HttpResponse {
        let drained = session.drain_flash();
        let messages = drained
            .get(&FlashKind::Success)
            .map(|m| m.join(","))
            .unwrap_or_default();
        HttpResponse::Ok().body(messages)
    }

    async fn login(session: Session) -> HttpResponse {
        session.log_in(uuid::Uuid::new_v4());
        HttpResponse::Ok().finish()
    }

    async fn noop() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
        res.response()
            .cookies()
            .find(|c| c.name() == "session")
            .map(|c| c.into_owned())
    }

    fn app(
        store: Arc<MemorySessionStore>,
        config: SessionConfig,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl actix_web::body::MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(SessionMiddleware::new(store, SECRET, config))
            .route("/push", web::get().to(push))
            .route("/drain", web::get().to(drain))
            .route("/login", web::get().to(login))
            .route("/noop", web::get().to(noop))
    }

    #[actix_web::test]
    async fn test_new_visitor_gets_signed_cookie() {
        let store = Arc::new(MemorySessionStore::new());
        let app = test::init_service(app(store.clone(), SessionConfig::default())).await;

        let req = test::TestRequest::get().uri("/noop").to_request();
        let res = test::call_service(&app, req).await;

        let cookie = session_cookie(&res).expect("session cookie");
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(7)));
        assert!(CookieSigner::new(SECRET).verify(cookie.value()).is_some());
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn test_lazy_creation_without_save_uninitialized() {
        let store = Arc::new(MemorySessionStore::new());
        let config = SessionConfig {
            save_uninitialized: false,
            ..SessionConfig::default()
        };
        let app = test::init_service(app(store.clone(), config)).await;

        let req = test::TestRequest::get().uri("/noop").to_request();
        let res = test::call_service(&app, req).await;
        assert!(session_cookie(&res).is_none());
        assert!(store.is_empty());

        let req = test::TestRequest::get().uri("/push").to_request();
        let res = test::call_service(&app, req).await;
        assert!(session_cookie(&res).is_some());
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn test_flash_survives_exactly_one_request() {
        let store = Arc::new(MemorySessionStore::new());
        let app = test::init_service(app(store, SessionConfig::default())).await;

        let req = test::TestRequest::get().uri("/push").to_request();
        let res = test::call_service(&app, req).await;
        let cookie = session_cookie(&res).unwrap();

        let req = test::TestRequest::get().uri("/drain").cookie(cookie.clone()).to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "x");

        let req = test::TestRequest::get().uri("/drain").cookie(cookie).to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "");
    }

    #[actix_web::test]
    async fn test_tampered_cookie_starts_fresh_session() {
        let store = Arc::new(MemorySessionStore::new());
        let app = test::init_service(app(store.clone(), SessionConfig::default())).await;

        let forged = Cookie::new("session", "Zm9yZ2Vk.c2lnbmF0dXJl");
        let req = test::TestRequest::get().uri("/noop").cookie(forged.clone()).to_request();
        let res = test::call_service(&app, req).await;

        let issued = session_cookie(&res).unwrap();
        assert_ne!(issued.value(), forged.value());
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn test_login_rotates_session_id() {
        let store = Arc::new(MemorySessionStore::new());
        let app = test::init_service(app(store.clone(), SessionConfig::default())).await;

        let req = test::TestRequest::get().uri("/push").to_request();
        let res = test::call_service(&app, req).await;
        let before = session_cookie(&res).unwrap();

        let req = test::TestRequest::get().uri("/login").cookie(before.clone()).to_request();
        let res = test::call_service(&app, req).await;
        let after = session_cookie(&res).unwrap();

        let signer = CookieSigner::new(SECRET);
        let old_id = signer.verify(before.value()).unwrap();
        let new_id = signer.verify(after.value()).unwrap();
        assert_ne!(old_id, new_id);
        assert!(store.load(&old_id).await.unwrap().is_none());

        let record = store.load(&new_id).await.unwrap().unwrap();
        assert!(record.state.user.is_some());
        assert!(!record.state.flash.is_empty());
    }

    /// Memory store whose saves fail once `fail_saves` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemorySessionStore,
        fail_saves: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl SessionStore for FlakyStore {
        async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, SessionError> {
            self.inner.load(id).await
        }

        async fn save(&self, id: &SessionId, record: &SessionRecord) -> Result<(), SessionError> {
            if self.fail_saves.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(SessionError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.save(id, record).await
        }

        async fn touch(
            &self,
            id: &SessionId,
            expires_at: DateTime<Utc>,
            touched_at: DateTime<Utc>,
        ) -> Result<(), SessionError> {
            self.inner.touch(id, expires_at, touched_at).await
        }

        async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
            self.inner.destroy(id).await
        }

        async fn purge_expired(&self) -> Result<u64, SessionError> {
            self.inner.purge_expired().await
        }
    }

    #[actix_web::test]
    async fn test_failed_renewal_keeps_old_session() {
        let store = Arc::new(FlakyStore::default());
        let app = test::init_service(
            App::new()
                .wrap(SessionMiddleware::new(
                    store.clone(),
                    SECRET,
                    SessionConfig::default(),
                ))
                .route("/push", web::get().to(push))
                .route("/login", web::get().to(login)),
        )
        .await;

        let req = test::TestRequest::get().uri("/push").to_request();
        let res = test::call_service(&app, req).await;
        let cookie = session_cookie(&res).unwrap();
        let id = CookieSigner::new(SECRET).verify(cookie.value()).unwrap();

        store
            .fail_saves
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let req = test::TestRequest::get().uri("/login").cookie(cookie).to_request();
        let res = test::call_service(&app, req).await;

        assert!(res.status().is_server_error());
        let kept = store.load(&id).await.unwrap().unwrap();
        assert!(kept.state.user.is_none());
        assert!(!kept.state.flash.is_empty());
    }

    #[actix_web::test]
    async fn test_unchanged_session_touched_only_after_window() {
        let store = Arc::new(MemorySessionStore::new());
        let app = test::init_service(app(store.clone(), SessionConfig::default())).await;
        let signer = CookieSigner::new(SECRET);

        let fresh = SessionId::generate();
        store
            .save(
                &fresh,
                &SessionRecord::new(SessionState::default(), Duration::days(7), Utc::now()),
            )
            .await
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/noop")
            .cookie(Cookie::new("session", signer.sign(&fresh).unwrap()))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(session_cookie(&res).is_none());

        let stale = SessionId::generate();
        let two_days_ago = Utc::now() - Duration::days(2);
        store
            .save(
                &stale,
                &SessionRecord::new(SessionState::default(), Duration::days(7), two_days_ago),
            )
            .await
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/noop")
            .cookie(Cookie::new("session", signer.sign(&stale).unwrap()))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert!(session_cookie(&res).is_some());
        let touched = store.load(&stale).await.unwrap().unwrap();
        assert!(touched.touched_at > two_days_ago);
    }
}
