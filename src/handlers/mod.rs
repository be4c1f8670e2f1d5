pub mod api_v1;
pub mod auth_handlers;
pub mod dashboard;
pub mod workflow_handlers;

use actix_web::{HttpResponse, web};

use crate::auth::middleware::require_auth;

/// Register every route except static files and the 404 fallback.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // JSON API, with its own auth guard, registered before the page scope.
    cfg.service(
        web::resource("/api/v1/session")
            .route(web::post().to(auth_handlers::api_login))
            .route(web::delete().to(auth_handlers::api_logout)),
    );
    cfg.service(web::scope("/api/v1").configure(api_v1::configure));

    // Public pages
    cfg.route("/login", web::get().to(auth_handlers::login_page));
    cfg.route("/login", web::post().to(auth_handlers::login_submit));
    cfg.route(
        "/",
        web::get().to(|| async {
            HttpResponse::SeeOther()
                .insert_header(("Location", "/dashboard"))
                .finish()
        }),
    );

    // Protected pages
    cfg.service(
        web::scope("")
            .wrap(actix_web::middleware::from_fn(require_auth))
            .route("/dashboard", web::get().to(dashboard::index))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/ambulances/{id}/workflow", web::get().to(workflow_handlers::overview))
            .route("/ambulances/{id}/check-in", web::post().to(workflow_handlers::check_in))
            .route("/ambulances/{id}/workflow/{step}", web::get().to(workflow_handlers::step_page))
            .route("/ambulances/{id}/workflow/{step}", web::post().to(workflow_handlers::complete)),
    );
}
