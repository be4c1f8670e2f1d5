use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use ambufleet::auth::{password, rate_limit::RateLimiter};
use ambufleet::config::AppConfig;
use ambufleet::store::{FleetStore, PgStore};
use ambufleet::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;

    let store: Arc<dyn FleetStore> = Arc::new(PgStore::new(pool));

    let admin_hash = password::hash_password(&config.admin_password)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    db::seed_admin(store.as_ref(), &admin_hash)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let secret_key = match &config.session_key {
        Some(val) => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        None => {
            log::warn!("No usable SESSION_KEY; generating a random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let limiter = RateLimiter::new();
    let cookie_secure = config.cookie_secure;

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .service(actix_files::Files::new("/static", "./static"))
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                let html = include_str!("../templates/errors/404.html");
                actix_web::HttpResponse::NotFound()
                    .content_type("text/html; charset=utf-8")
                    .body(html)
            }))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
