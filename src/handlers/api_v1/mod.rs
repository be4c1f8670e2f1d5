pub mod alerts;
pub mod ambulances;
pub mod audit;
pub mod incidents;
pub mod materials;
pub mod reports;
pub mod spaces;
pub mod users;
pub mod workflow;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::{Next, from_fn},
    web,
};

use crate::auth::middleware::require_api_auth;

/// CSRF protection for REST API mutation endpoints.
///
/// Rejects POST/PUT/DELETE requests that don't have Content-Type: application/json.
/// Browsers cannot send cross-origin JSON with cookies via a simple form POST,
/// so the header check stands in for a token. GET requests are exempt.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API v1 routes (mounted under `/api/v1`).
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // Registered last so it runs first: anonymous callers get 401
            // before the content-type check.
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_api_auth))
            // Ambulances
            .route("/ambulances", web::get().to(ambulances::list))
            .route("/ambulances", web::post().to(ambulances::create))
            .route("/ambulances/{id}", web::get().to(ambulances::read))
            .route("/ambulances/{id}", web::put().to(ambulances::update))
            .route("/ambulances/{id}", web::delete().to(ambulances::delete))
            .route("/ambulances/{id}/check-in", web::post().to(ambulances::check_in))
            // Workflow: /reset BEFORE /{step}
            .route("/ambulances/{id}/workflow", web::get().to(workflow::progress))
            .route("/ambulances/{id}/workflow/reset", web::post().to(workflow::reset))
            .route("/ambulances/{id}/workflow/{step}", web::post().to(workflow::complete))
            // Ambulance stock
            .route("/ambulances/{id}/materials", web::get().to(materials::list_for_ambulance))
            .route("/ambulances/{id}/materials", web::post().to(materials::create_for_ambulance))
            .route("/ambulance-materials/{id}", web::put().to(materials::update_ambulance_material))
            .route("/ambulance-materials/{id}", web::delete().to(materials::delete_ambulance_material))
            .route("/ambulance-materials/{id}/adjust", web::post().to(materials::adjust_ambulance_material))
            // Spaces and central stock
            .route("/spaces", web::get().to(spaces::list))
            .route("/spaces", web::post().to(spaces::create))
            .route("/spaces/{id}", web::put().to(spaces::update))
            .route("/spaces/{id}", web::delete().to(spaces::delete))
            .route("/spaces/{id}/materials", web::get().to(materials::list_for_space))
            .route("/spaces/{id}/materials", web::post().to(materials::create_for_space))
            .route("/ampulario", web::get().to(materials::list_central))
            .route("/ampulario/{id}", web::put().to(materials::update_central_material))
            .route("/ampulario/{id}", web::delete().to(materials::delete_central_material))
            .route("/ampulario/{id}/adjust", web::post().to(materials::adjust_central_material))
            // Alerts, incidents, reporting
            .route("/alerts", web::get().to(alerts::list))
            .route("/ambulances/{id}/incidents", web::get().to(incidents::list))
            .route("/ambulances/{id}/incidents", web::post().to(incidents::create))
            .route("/incidents/{id}/resolve", web::post().to(incidents::resolve))
            .route("/reports/fleet", web::get().to(reports::fleet))
            // Administration
            .route("/audit", web::get().to(audit::list))
            .route("/users", web::get().to(users::list))
            .route("/users", web::post().to(users::create)),
    );
}
