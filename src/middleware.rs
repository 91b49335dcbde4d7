use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};

use crate::domain::session::SessionData;
use crate::domain::user::{Role, UserView};
use crate::errors::AppError;
use crate::AppAuthService;

/// Name of the HttpOnly cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "bakery_session";

/// The authenticated identity for the current request, inserted by
/// `RoleGuard` and read by handlers.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: UserView,
    pub session: SessionData,
}

impl FromRequest for CurrentUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<CurrentUser>().cloned().ok_or_else(|| {
            // Reaching a guarded handler without passing the guard is a
            // wiring bug, not a client error.
            AppError::Internal("request reached a guarded handler without an identity".into())
                .into()
        }))
    }
}

/// Scope-level role gate: resolves the session cookie to a user, checks the
/// role against the allowed set, and either forwards the request (identity
/// attached) or answers with a redirect.
///
/// Unauthenticated callers are sent to `/login`; authenticated callers with
/// the wrong role are sent to their own role home with a notice.
pub struct RoleGuard {
    allowed: &'static [Role],
}

impl RoleGuard {
    pub fn admin() -> Self {
        Self {
            allowed: &[Role::Admin],
        }
    }

    pub fn staff() -> Self {
        Self {
            allowed: &[Role::Employee, Role::Admin],
        }
    }

    pub fn customer() -> Self {
        Self {
            allowed: &[Role::Customer],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RoleGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGuardMiddleware {
            service: Rc::new(service),
            allowed: self.allowed,
        }))
    }
}

pub struct RoleGuardMiddleware<S> {
    service: Rc<S>,
    allowed: &'static [Role],
}

impl<S, B> Service<ServiceRequest> for RoleGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed = self.allowed;

        Box::pin(async move {
            let auth = req
                .app_data::<web::Data<AppAuthService>>()
                .cloned()
                .ok_or_else(|| {
                    Error::from(AppError::Internal("auth service not configured".into()))
                })?;

            let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
            let identity = match token {
                None => None,
                Some(token) => web::block(move || auth.authenticate(&token))
                    .await
                    .map_err(AppError::from)?
                    .map_err(AppError::from)?,
            };

            match identity {
                None => Ok(redirect(req, "/login".to_string())),
                Some((user, session)) => {
                    if allowed.contains(&user.role) {
                        req.extensions_mut().insert(CurrentUser { user, session });
                        service
                            .call(req)
                            .await
                            .map(|res| res.map_into_left_body())
                    } else {
                        let location = format!("{}?notice=forbidden", user.role.home_path());
                        Ok(redirect(req, location))
                    }
                }
            }
        })
    }
}

fn redirect<B>(req: ServiceRequest, location: String) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish();
    req.into_response(response).map_into_right_body()
}
