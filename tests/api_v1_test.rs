#[macro_use]
mod common;
use common::*;

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use ambufleet::models::user::UserRole;

#[actix_web::test]
async fn test_api_requires_session() {
    let store = store();
    let app = test_app!(store.clone());

    let req = test::TestRequest::get().uri("/api/v1/ambulances").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Anonymous mutations are refused before the content-type check
    let req = test::TestRequest::post().uri("/api/v1/spaces").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_wrong_password_is_rejected() {
    let store = store();
    add_user(&store, "tecnico", UserRole::Technician).await;
    let app = test_app!(store.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/session")
        .set_json(json!({"username": "tecnico", "password": "not-the-password"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_pages_redirect_anonymous_visitors() {
    let store = store();
    let app = test_app!(store.clone());

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get("location").unwrap(), "/login");
}

#[actix_web::test]
async fn test_workflow_gate_over_http() {
    let store = store();
    add_user(&store, "tecnico", UserRole::Technician).await;
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let app = test_app!(store.clone());
    let cookie = login!(app, "tecnico");

    let post_step = |step: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/ambulances/{}/workflow/{step}", amb.id))
            .insert_header(("content-type", "application/json"))
            .cookie(cookie.clone())
            .to_request()
    };

    let resp = test::call_service(&app, post_step("cleaning")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"], "next_step=daily_check");

    let resp = test::call_service(&app, post_step("daily-check")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["applied"], true);
    assert_eq!(body["next_step"], "mechanical_review");

    let resp = test::call_service(&app, post_step("daily_check")).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["applied"], false);

    let resp = test::call_service(&app, post_step("polishing")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/ambulances/{}/workflow", amb.id))
        .cookie(cookie.clone())
        .to_request();
    let progress: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(progress["next_step"], "mechanical_review");
    assert_eq!(progress["completed_count"], 1);

    let resp = test::call_service(&app, post_step("reset")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["daily_check_completed"], false);
}

#[actix_web::test]
async fn test_mutations_need_json_content_type() {
    let store = store();
    add_user(&store, "admin", UserRole::Admin).await;
    let app = test_app!(store.clone());
    let cookie = login!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/api/v1/spaces")
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("name=Farmacia")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/v1/spaces")
        .set_json(json!({"name": "Farmacia"}))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let entries = {
        use ambufleet::store::AuditStore;
        store.list_audit(10, 0).await.unwrap()
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].target_type, "space");
}

#[actix_web::test]
async fn test_viewer_cannot_modify_fleet() {
    let store = store();
    add_user(&store, "observer", UserRole::Viewer).await;
    add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let app = test_app!(store.clone());
    let cookie = login!(app, "observer");

    let req = test::TestRequest::get()
        .uri("/api/v1/ambulances")
        .cookie(cookie.clone())
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let req = test::TestRequest::post()
        .uri("/api/v1/ambulances")
        .set_json(json!({"name": "Bravo 2", "plate": "2222-BBB", "year": 2022}))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_central_stock_rules_over_http() {
    let store = store();
    add_user(&store, "tecnico", UserRole::Technician).await;
    let space = add_space(&store, "Farmacia").await;
    let app = test_app!(store.clone());
    let cookie = login!(app, "tecnico");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/spaces/{}/materials", space.id))
        .set_json(json!({
            "name": "Adrenalina",
            "dose": "1mg",
            "unit": "ampolla",
            "route": "IV/IM",
            "quantity": 2,
            "min_stock_level": 1,
            "expiry_date": "2099-12-31",
        }))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let material: Value = test::read_body_json(resp).await;
    let material_id = material["id"].as_i64().unwrap();
    assert_eq!(material["kind"], "central");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/ampulario/{material_id}/adjust"))
        .set_json(json!({"delta": -3}))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/ampulario/{material_id}/adjust"))
        .set_json(json!({"delta": -1}))
        .cookie(cookie.clone())
        .to_request();
    let adjusted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(adjusted["quantity"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/alerts?space_id={}&severity=medium", space.id))
        .cookie(cookie.clone())
        .to_request();
    let alerts: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(alerts[0]["type"], "low_stock_central");

    let req = test::TestRequest::get()
        .uri("/api/v1/alerts?severity=urgent")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/spaces/{}", space.id))
        .insert_header(("content-type", "application/json"))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_dashboard_badge_matches_high_alerts() {
    use ambufleet::alerts::{self, AlertScope};

    let store = store();
    add_user(&store, "tecnico", UserRole::Technician).await;
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    add_ambulance_material(&store, amb.id, "Gauze", 0, Some(3), None).await;
    let list = alerts::compute_alerts(
        store.as_ref(),
        AlertScope::default(),
        alerts::local_today(),
        chrono::Utc::now(),
    )
    .await
    .unwrap();
    let high = alerts::count_by_severity(&list).high;
    assert!(high > 0);
    let badge = format!("title=\"Urgent alerts\">{high}</a>");

    let app = test_app!(store.clone());
    let cookie = login!(app, "tecnico");

    for uri in ["/dashboard".to_string(), format!("/ambulances/{}/workflow", amb.id)] {
        let req = test::TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let body = test::read_body(resp).await;
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains(&badge), "{uri} should show {badge}");
    }
}
