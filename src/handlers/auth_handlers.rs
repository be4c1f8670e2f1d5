use std::net::{IpAddr, Ipv4Addr};

use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::{csrf, password, rate_limit::RateLimiter, session};
use crate::errors::{AppError, render};
use crate::models::user::{User, UserRole};
use crate::store::FleetStore;
use crate::templates_structs::{APP_NAME, LoginTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct ApiLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct ApiLoginResponse {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
    pub permissions: Vec<&'static str>,
}

enum LoginOutcome {
    Blocked,
    Rejected,
    Accepted(User),
}

fn client_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Shared credential check for the form and JSON logins. The rate limit is
/// consulted before the store is touched.
async fn authenticate(
    store: &dyn FleetStore,
    limiter: &RateLimiter,
    ip: IpAddr,
    username: &str,
    password_input: &str,
) -> Result<LoginOutcome, AppError> {
    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}: too many failed attempts");
        return Ok(LoginOutcome::Blocked);
    }

    let found = store.find_user_by_username(username.trim()).await?;
    let verified = match &found {
        Some(u) => password::verify_password(password_input, &u.password_hash).unwrap_or_else(|e| {
            log::error!("Stored hash for '{}' is unreadable: {e}", u.username);
            false
        }),
        None => false,
    };

    match found {
        Some(user) if verified => {
            limiter.clear(ip);
            log::info!("User '{}' signed in", user.username);
            Ok(LoginOutcome::Accepted(user))
        }
        _ => {
            limiter.record_failure(ip);
            log::info!("Failed login for '{}' from {ip}", username.trim());
            Ok(LoginOutcome::Rejected)
        }
    }
}

fn login_form(session: &Session, error: Option<&str>) -> Result<HttpResponse, AppError> {
    render(LoginTemplate {
        error: error.map(str::to_string),
        app_name: APP_NAME.to_string(),
        csrf_token: csrf::get_or_create_token(session),
    })
}

pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    if session::get_user_id(&session).is_some() {
        return Ok(HttpResponse::SeeOther()
            .insert_header(("Location", "/dashboard"))
            .finish());
    }
    login_form(&session, None)
}

pub async fn login_submit(
    req: HttpRequest,
    store: web::Data<dyn FleetStore>,
    session: Session,
    form: web::Form<LoginForm>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    let outcome = authenticate(
        store.get_ref(),
        &limiter,
        client_ip(&req),
        &form.username,
        &form.password,
    )
    .await?;

    match outcome {
        LoginOutcome::Accepted(user) => {
            session::establish(&session, &user)?;
            Ok(HttpResponse::SeeOther()
                .insert_header(("Location", "/dashboard"))
                .finish())
        }
        LoginOutcome::Blocked => login_form(
            &session,
            Some("Too many failed login attempts. Please try again later."),
        ),
        LoginOutcome::Rejected => login_form(&session, Some("Invalid username or password")),
    }
}

pub async fn logout(session: Session, form: web::Form<CsrfOnly>) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    session.purge();
    Ok(HttpResponse::SeeOther()
        .insert_header(("Location", "/login"))
        .finish())
}

/// POST /api/v1/session - sign in with a JSON body; the session cookie is set
/// on success.
pub async fn api_login(
    req: HttpRequest,
    store: web::Data<dyn FleetStore>,
    session: Session,
    body: web::Json<ApiLoginRequest>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, AppError> {
    let outcome = authenticate(
        store.get_ref(),
        &limiter,
        client_ip(&req),
        &body.username,
        &body.password,
    )
    .await?;

    match outcome {
        LoginOutcome::Accepted(user) => {
            session::establish(&session, &user)?;
            Ok(HttpResponse::Ok().json(ApiLoginResponse {
                user_id: user.id,
                username: user.username,
                role: user.role,
                permissions: user.role.permissions().to_vec(),
            }))
        }
        LoginOutcome::Blocked => Ok(HttpResponse::TooManyRequests().json(
            crate::errors::ApiErrorResponse {
                error: "Too many failed login attempts".to_string(),
                details: None,
            },
        )),
        LoginOutcome::Rejected => Err(AppError::Session("Invalid username or password".to_string())),
    }
}

/// DELETE /api/v1/session
pub async fn api_logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}
