mod common;
use common::*;

use chrono::{Duration, Utc};

use ambufleet::alerts::{self, AlertScope, AlertType, Severity};
use ambufleet::errors::AppError;
use ambufleet::store::MaterialStore;
use ambufleet::models::material::{MaterialKind, MaterialRef};
use ambufleet::workflow::{self, StepKey};

fn types(list: &[alerts::Alert]) -> Vec<AlertType> {
    list.iter().map(|a| a.alert_type).collect()
}

#[tokio::test]
async fn test_empty_fleet_has_no_alerts() {
    let store = store();
    let list = alerts::compute_alerts(store.as_ref(), AlertScope::default(), date(2026, 5, 10), Utc::now())
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_new_ambulance_raises_pending_step_alerts() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;

    let list = alerts::compute_alerts(store.as_ref(), AlertScope::default(), date(2026, 5, 10), Utc::now())
        .await
        .unwrap();
    assert_eq!(
        types(&list),
        vec![
            AlertType::DailyCheckPending,
            AlertType::ReviewPending,
            AlertType::CleaningPending,
        ]
    );
    assert_eq!(list[0].id, format!("daily_check_pending-{}", amb.id));
    assert_eq!(list[2].severity, Severity::Low);
    assert!(list.iter().all(|a| a.ambulance_id == Some(amb.id)));
}

#[tokio::test]
async fn test_completed_steps_clear_their_alerts() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();
    for step in [StepKey::DailyCheck, StepKey::MechanicalReview, StepKey::Cleaning] {
        workflow::complete_step(store.as_ref(), amb.id, step, now).await.unwrap();
    }

    let list = alerts::compute_alerts(store.as_ref(), AlertScope::default(), date(2026, 5, 10), now)
        .await
        .unwrap();
    assert!(list.is_empty(), "inventory has no pending alert: {list:?}");
}

#[tokio::test]
async fn test_expiry_windows_differ_between_ambulance_and_central_stock() {
    let store = store();
    let today = date(2026, 5, 10);
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let space = add_space(&store, "Farmacia").await;

    // Five days out: inside the ambulance window, outside the central one
    let gauze = add_ambulance_material(&store, amb.id, "Gauze", 10, None, Some(today + Duration::days(5))).await;
    add_central_material(&store, space.id, "Adrenalina", 10, None, Some(today + Duration::days(5))).await;
    // Three days out: inside both
    let atropina = add_central_material(&store, space.id, "Atropina", 10, None, Some(today + Duration::days(3))).await;

    let scope = AlertScope { ambulance_id: None, space_id: Some(space.id) };
    let central = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert_eq!(types(&central), vec![AlertType::AmpularioExpiringSoon]);
    assert_eq!(central[0].material_id, Some(atropina.id));
    assert_eq!(central[0].space_id, Some(space.id));

    let scope = AlertScope { ambulance_id: Some(amb.id), space_id: None };
    let local = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    let expiring: Vec<_> = local
        .iter()
        .filter(|a| a.alert_type == AlertType::ExpiringSoon)
        .collect();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].material_id, Some(gauze.id));
    assert_eq!(expiring[0].severity, Severity::Medium);
}

#[tokio::test]
async fn test_expired_material_is_high_severity_and_first() {
    let store = store();
    let today = date(2026, 5, 10);
    let space = add_space(&store, "Farmacia").await;
    add_central_material(&store, space.id, "Fresh", 10, None, Some(today + Duration::days(2))).await;
    let old = add_central_material(&store, space.id, "Old", 10, None, Some(today - Duration::days(1))).await;

    let scope = AlertScope { ambulance_id: None, space_id: Some(space.id) };
    let list = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert_eq!(
        types(&list),
        vec![AlertType::AmpularioExpiredMaterial, AlertType::AmpularioExpiringSoon]
    );
    assert_eq!(list[0].id, format!("ampulario_expired_material-{}", old.id));
    assert_eq!(list[0].severity, Severity::High);
}

#[tokio::test]
async fn test_low_stock_follows_adjustments() {
    let store = store();
    let today = date(2026, 5, 10);
    let space = add_space(&store, "Farmacia").await;
    let m = add_central_material(&store, space.id, "Suero", 5, Some(2), None).await;
    let scope = AlertScope { ambulance_id: None, space_id: Some(space.id) };

    let list = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert!(list.is_empty());

    let reference = MaterialRef { kind: MaterialKind::Central, id: m.id };
    store.adjust_quantity(reference, -3).await.unwrap();
    let list = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert_eq!(types(&list), vec![AlertType::LowStockCentral]);
    assert_eq!(list[0].severity, Severity::Medium);

    store.adjust_quantity(reference, -2).await.unwrap();
    let list = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert_eq!(list[0].severity, Severity::High);
}

#[tokio::test]
async fn test_scope_to_one_ambulance() {
    let store = store();
    let today = date(2026, 5, 10);
    let a = add_ambulance(&store, "Alfa 1", "1111-AAA").await;
    let b = add_ambulance(&store, "Bravo 2", "2222-BBB").await;
    add_ambulance_material(&store, b.id, "Gauze", 0, Some(3), None).await;

    let scope = AlertScope { ambulance_id: Some(a.id), space_id: None };
    let list = alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await.unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|al| al.ambulance_id == Some(a.id)));

    let all = alerts::compute_alerts(store.as_ref(), AlertScope::default(), today, Utc::now())
        .await
        .unwrap();
    // 3 pending steps for each ambulance plus one empty shelf
    assert_eq!(all.len(), 7);
    assert_eq!(all[0].alert_type, AlertType::LowStockAmbulance);
    assert_eq!(all[0].severity, Severity::High);
}

#[tokio::test]
async fn test_unknown_scope_is_not_found() {
    let store = store();
    let today = date(2026, 5, 10);

    let scope = AlertScope { ambulance_id: Some(42), space_id: None };
    assert!(matches!(
        alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await,
        Err(AppError::NotFound)
    ));

    let scope = AlertScope { ambulance_id: None, space_id: Some(42) };
    assert!(matches!(
        alerts::compute_alerts(store.as_ref(), scope, today, Utc::now()).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_count_by_severity() {
    let store = store();
    let today = date(2026, 5, 10);
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    add_ambulance_material(&store, amb.id, "Gauze", 0, Some(1), Some(today - Duration::days(3))).await;

    let list = alerts::compute_alerts(store.as_ref(), AlertScope::default(), today, Utc::now())
        .await
        .unwrap();
    let counts = alerts::count_by_severity(&list);
    assert_eq!(counts.high, 2);
    assert_eq!(counts.medium, 2);
    assert_eq!(counts.low, 1);
    assert_eq!(counts.total(), list.len());
}
