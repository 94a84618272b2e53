use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::{Ready, ready};
use std::rc::Rc;

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use uuid::Uuid;

use crate::flash::FlashKind;
use crate::types::{SessionError, SessionId, SessionState};

/// Handle to the session bound to the current request.
///
/// Cloning is cheap; every clone sees the same state. Changes are persisted by
/// [`crate::SessionMiddleware`] once the response is ready.
#[derive(Clone)]
pub struct Session(Rc<RefCell<SessionInner>>);

struct SessionInner {
    id: Option<SessionId>,
    state: SessionState,
    renewed: bool,
}

/// What the middleware needs to persist once the handler is done.
pub(crate) struct SessionOutcome {
    pub(crate) id: Option<SessionId>,
    pub(crate) state: SessionState,
    pub(crate) renewed: bool,
}

impl Session {
    pub(crate) fn new(id: Option<SessionId>, state: SessionState) -> Self {
        Self(Rc::new(RefCell::new(SessionInner {
            id,
            state,
            renewed: false,
        })))
    }

    /// Whether this session has no persisted record yet.
    pub fn is_new(&self) -> bool {
        self.0.borrow().id.is_none()
    }

    /// Identity reference of the logged-in user, if any.
    pub fn user(&self) -> Option<Uuid> {
        self.0.borrow().state.user
    }

    /// Binds `user_id` to the session and rotates the session id.
    pub fn log_in(&self, user_id: Uuid) {
        let mut inner = self.0.borrow_mut();
        inner.state.user = Some(user_id);
        inner.renewed = true;
    }

    /// Clears the identity reference and rotates the session id.
    pub fn log_out(&self) {
        let mut inner = self.0.borrow_mut();
        inner.state.user = None;
        inner.state.return_to = None;
        inner.renewed = true;
    }

    /// Queues a flash message for the next rendered page.
    pub fn push_flash(&self, kind: FlashKind, message: impl Into<String>) {
        self.0.borrow_mut().state.flash.push(kind, message);
    }

    /// Takes every pending flash message.
    pub fn drain_flash(&self) -> BTreeMap<FlashKind, Vec<String>> {
        self.0.borrow_mut().state.flash.drain_all()
    }

    /// Remembers where to send the visitor after logging in.
    pub fn set_return_to(&self, path: impl Into<String>) {
        self.0.borrow_mut().state.return_to = Some(path.into());
    }

    /// Takes the remembered post-login destination.
    pub fn take_return_to(&self) -> Option<String> {
        self.0.borrow_mut().state.return_to.take()
    }

    pub(crate) fn outcome(&self) -> SessionOutcome {
        let inner = self.0.borrow();
        SessionOutcome {
            id: inner.id.clone(),
            state: inner.state.clone(),
            renewed: inner.renewed,
        }
    }
}

/// Access to the [`Session`] attached by the session middleware.
pub trait SessionExt {
    /// Returns the bound session, or `None` if no session middleware ran.
    fn get_session(&self) -> Option<Session>;
}

impl SessionExt for HttpRequest {
    fn get_session(&self) -> Option<Session> {
        self.extensions().get::<Session>().cloned()
    }
}

impl SessionExt for ServiceRequest {
    fn get_session(&self) -> Option<Session> {
        self.extensions().get::<Session>().cloned()
    }
}

impl FromRequest for Session {
    type Error = SessionError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.get_session().ok_or(SessionError::NotBound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_flash_push_then_drain_once() {
        let session = Session::new(None, SessionState::default());
        session.push_flash(FlashKind::Success, "x");

        let first = session.drain_flash();
        assert_eq!(first.get(&FlashKind::Success), Some(&vec!["x".to_string()]));
        assert!(session.drain_flash().get(&FlashKind::Success).is_none());
    }

    #[test]
    fn test_log_in_and_out_mark_renewal() {
        let session = Session::new(Some(SessionId::generate()), SessionState::default());
        assert!(!session.outcome().renewed);

        let user = Uuid::new_v4();
        session.log_in(user);
        assert_eq!(session.user(), Some(user));
        assert!(session.outcome().renewed);

        session.set_return_to("/campgrounds/new");
        session.log_out();
        assert_eq!(session.user(), None);
        assert_eq!(session.take_return_to(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new(None, SessionState::default());
        let other = session.clone();
        other.set_return_to("/campgrounds");

        assert_eq!(session.take_return_to().as_deref(), Some("/campgrounds"));
        assert_eq!(other.take_return_to(), None);
    }

    #[actix_web::test]
    async fn test_extractor_requires_middleware() {
        let req = TestRequest::default().to_http_request();
        assert!(req.get_session().is_none());

        let result = Session::extract(&req).await;
        assert!(matches!(result, Err(SessionError::NotBound)));
    }
}
