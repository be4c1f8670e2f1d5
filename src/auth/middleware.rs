use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use crate::errors::ApiErrorResponse;

fn has_user(req: &ServiceRequest) -> bool {
    req.get_session().get::<i64>("user_id").unwrap_or(None).is_some()
}

/// Page guard: anonymous visitors are redirected to `/login`.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if !has_user(&req) {
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/login"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// API guard: anonymous callers get a JSON 401 instead of a redirect.
pub async fn require_api_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if !has_user(&req) {
        let response = HttpResponse::Unauthorized().json(ApiErrorResponse {
            error: "Authentication required".to_string(),
            details: None,
        });
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
