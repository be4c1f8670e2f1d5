#![allow(dead_code, unused_macros)]

use std::sync::Arc;

use chrono::NaiveDate;

use ambufleet::auth::password;
use ambufleet::models::ambulance::{Ambulance, AmbulanceInput};
use ambufleet::models::material::{
    AdministrationRoute, Material, MaterialCategory, MaterialDraft, MaterialOwner,
};
use ambufleet::models::space::Space;
use ambufleet::models::user::{NewUser, User, UserRole};
use ambufleet::store::{AmbulanceStore, MaterialStore, MemoryStore, SpaceStore, UserStore};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Fresh in-memory store.
pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn add_ambulance(store: &MemoryStore, name: &str, plate: &str) -> Ambulance {
    store
        .create_ambulance(&AmbulanceInput {
            name: name.to_string(),
            plate: plate.to_string(),
            model: "Mercedes Sprinter".to_string(),
            year: 2021,
        })
        .await
        .expect("create ambulance")
}

pub async fn add_space(store: &MemoryStore, name: &str) -> Space {
    store.create_space(name).await.expect("create space")
}

pub async fn add_ambulance_material(
    store: &MemoryStore,
    ambulance_id: i64,
    name: &str,
    quantity: i64,
    min_stock_level: Option<i64>,
    expiry_date: Option<NaiveDate>,
) -> Material {
    store
        .create_material(&MaterialDraft {
            name: name.to_string(),
            quantity,
            expiry_date,
            min_stock_level,
            owner: MaterialOwner::Ambulance {
                ambulance_id,
                category: MaterialCategory::Consumable,
                location: None,
            },
        })
        .await
        .expect("create ambulance material")
}

pub async fn add_central_material(
    store: &MemoryStore,
    space_id: i64,
    name: &str,
    quantity: i64,
    min_stock_level: Option<i64>,
    expiry_date: Option<NaiveDate>,
) -> Material {
    store
        .create_material(&MaterialDraft {
            name: name.to_string(),
            quantity,
            expiry_date,
            min_stock_level,
            owner: MaterialOwner::Central {
                space_id,
                dose: "1mg".to_string(),
                unit: "ampolla".to_string(),
                route: AdministrationRoute::IvIm,
            },
        })
        .await
        .expect("create central material")
}

pub async fn add_user(store: &MemoryStore, username: &str, role: UserRole) -> User {
    store
        .create_user(&NewUser {
            username: username.to_string(),
            password_hash: password::hash_password(TEST_PASSWORD).expect("hash"),
            display_name: username.to_string(),
            role,
        })
        .await
        .expect("create user")
}

/// Build the full application around `$store` and initialise it as a test service.
macro_rules! test_app {
    ($store:expr) => {{
        let store: std::sync::Arc<dyn ambufleet::store::FleetStore> = $store;
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::generate(),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::from(store))
                .app_data(actix_web::web::Data::new(
                    ambufleet::auth::rate_limit::RateLimiter::new(),
                ))
                .configure(ambufleet::handlers::configure),
        )
        .await
    }};
}

/// Sign in through the JSON endpoint and return the session cookie.
macro_rules! login {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/session")
            .set_json(serde_json::json!({
                "username": $username,
                "password": common::TEST_PASSWORD,
            }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login failed");
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .expect("session cookie")
            .into_owned()
    }};
}
