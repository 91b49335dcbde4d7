use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::application::auth_service::RegisterRequest;
use crate::domain::user::Role;
use crate::errors::AppError;
use crate::middleware::SESSION_COOKIE;
use crate::AppAuthService;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Requested role; granted only when the caller is an admin, otherwise
    /// silently degraded to customer.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .finish()
}

/// GET /login
///
/// Target of the unauthenticated redirect. A browser client would render a
/// form here; the API answers with instructions.
pub async fn login_page() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "ok": false,
        "msg": "Authentication required: POST {username, password} to /login"
    }))
}

/// POST /login
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Logged in; session cookie set"),
        (status = 400, description = "Unknown user, wrong password or deactivated account"),
    ),
    tag = "auth"
)]
pub async fn login(
    auth: web::Data<AppAuthService>,
    body: web::Json<LoginBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let (user, session) =
        web::block(move || auth.login(&body.username, &body.password)).await??;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.token))
        .json(json!({
            "ok": true,
            "msg": format!("Welcome back, {}", user.username),
            "redirect": user.role.home_path()
        })))
}

/// POST /register
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "Account created and logged in"),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username or email already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    auth: web::Data<AppAuthService>,
    req: HttpRequest,
    body: web::Json<RegisterBody>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

    let (user, session) = web::block(move || {
        let acting_is_admin = match &token {
            Some(token) => auth
                .authenticate(token)?
                .map(|(user, _)| user.role == Role::Admin)
                .unwrap_or(false),
            None => false,
        };
        auth.register(
            RegisterRequest {
                username: body.username,
                email: body.email,
                password: body.password,
                requested_role: body.role.as_deref().and_then(Role::parse),
            },
            acting_is_admin,
        )
    })
    .await??;

    Ok(HttpResponse::Created()
        .cookie(session_cookie(&session.token))
        .json(json!({
            "ok": true,
            "msg": "Account created",
            "redirect": user.role.home_path()
        })))
}

/// POST /logout
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Session invalidated; cookie cleared")),
    tag = "auth"
)]
pub async fn logout(
    auth: web::Data<AppAuthService>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        web::block(move || auth.logout(&token)).await??;
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();

    Ok(HttpResponse::Ok().cookie(removal).json(json!({
        "ok": true,
        "msg": "Logged out",
        "redirect": "/login"
    })))
}
