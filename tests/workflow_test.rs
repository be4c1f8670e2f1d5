mod common;
use common::*;

use chrono::Utc;

use ambufleet::errors::AppError;
use ambufleet::store::AmbulanceStore;
use ambufleet::workflow::{self, StepKey};

#[tokio::test]
async fn test_fresh_ambulance_starts_at_daily_check() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;

    assert_eq!(
        workflow::next_step_for(store.as_ref(), amb.id).await.unwrap(),
        Some(StepKey::DailyCheck)
    );
    assert!(workflow::is_step_accessible(&amb, StepKey::DailyCheck));
    for step in [StepKey::MechanicalReview, StepKey::Cleaning, StepKey::Inventory] {
        assert!(!workflow::is_step_accessible(&amb, step), "{step:?} should be locked");
    }
}

#[tokio::test]
async fn test_steps_must_be_completed_in_order() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();

    let done = workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, now)
        .await
        .expect("daily check");
    assert!(done.applied);
    assert_eq!(
        workflow::next_step_for(store.as_ref(), amb.id).await.unwrap(),
        Some(StepKey::MechanicalReview)
    );

    // Skipping ahead is refused and changes nothing
    let err = workflow::complete_step(store.as_ref(), amb.id, StepKey::Cleaning, now)
        .await
        .expect_err("cleaning before mechanical review");
    match err {
        AppError::StepOutOfOrder { requested, next } => {
            assert_eq!(requested, StepKey::Cleaning);
            assert_eq!(next, Some(StepKey::MechanicalReview));
        }
        other => panic!("expected StepOutOfOrder, got {other:?}"),
    }
    let unchanged = store.get_ambulance(amb.id).await.unwrap();
    assert!(!unchanged.cleaning_completed);
    assert!(!unchanged.mechanical_review_completed);

    workflow::complete_step(store.as_ref(), amb.id, StepKey::MechanicalReview, now)
        .await
        .expect("mechanical review");
    assert_eq!(
        workflow::next_step_for(store.as_ref(), amb.id).await.unwrap(),
        Some(StepKey::Cleaning)
    );
}

#[tokio::test]
async fn test_full_cycle_then_reset() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();

    for step in StepKey::all() {
        workflow::complete_step(store.as_ref(), amb.id, *step, now)
            .await
            .unwrap_or_else(|e| panic!("{step:?}: {e}"));
    }
    let done = store.get_ambulance(amb.id).await.unwrap();
    assert!(workflow::next_allowed_step(&done).is_none());
    assert!(workflow::progress(&done).is_complete);
    assert_eq!(done.inventory_at, Some(now));

    let reset = workflow::reset_cycle(store.as_ref(), amb.id).await.unwrap();
    assert_eq!(reset.completed_count(), 0);
    assert_eq!(
        workflow::next_allowed_step(&reset).map(|s| s.key),
        Some(StepKey::DailyCheck)
    );

    // Resetting an already clear cycle is harmless
    let again = workflow::reset_cycle(store.as_ref(), amb.id).await.unwrap();
    assert_eq!(again.completed_count(), 0);
}

#[tokio::test]
async fn test_progress_hides_timestamps_from_previous_cycle() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, Utc::now())
        .await
        .unwrap();
    let reset = workflow::reset_cycle(store.as_ref(), amb.id).await.unwrap();

    let progress = workflow::progress(&reset);
    assert_eq!(progress.completed_count, 0);
    assert!(progress.steps.iter().all(|s| s.completed_at.is_none()));
    assert_eq!(
        progress.steps.iter().filter(|s| s.accessible).count(),
        1,
        "only the first step is open after a reset"
    );
}

#[tokio::test]
async fn test_check_in_starts_new_cycle() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();
    workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, now)
        .await
        .unwrap();

    let checked = workflow::check_in(store.as_ref(), amb.id, 7, 120_500, now)
        .await
        .expect("check-in");
    assert_eq!(checked.last_known_kilometers, Some(120_500));
    assert_eq!(checked.last_check_in_by_user_id, Some(7));
    assert_eq!(checked.last_check_in_date, Some(now));
    assert_eq!(checked.completed_count(), 0);

    let err = workflow::check_in(store.as_ref(), amb.id, 7, -5, now)
        .await
        .expect_err("negative kilometers");
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_store_refuses_a_lower_odometer_reading() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();
    store.record_check_in(amb.id, 7, 120_500, now).await.unwrap();
    workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, now)
        .await
        .unwrap();

    match store.record_check_in(amb.id, 8, 120_000, now).await {
        Err(AppError::InvalidInput(msg)) => assert!(msg.contains("120500"), "{msg}"),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    let current = store.get_ambulance(amb.id).await.unwrap();
    assert_eq!(current.last_known_kilometers, Some(120_500));
    assert_eq!(current.last_check_in_by_user_id, Some(7));
    assert!(current.daily_check_completed, "a refused check-in keeps the cycle");

    // Same reading is allowed
    let again = store.record_check_in(amb.id, 8, 120_500, now).await.unwrap();
    assert_eq!(again.last_check_in_by_user_id, Some(8));
    assert!(matches!(
        store.record_check_in(99, 8, 1, now).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_unknown_ambulance_is_not_found() {
    let store = store();
    let err = workflow::complete_step(store.as_ref(), 99, StepKey::DailyCheck, Utc::now())
        .await
        .expect_err("missing ambulance");
    assert!(matches!(err, AppError::NotFound));
    assert!(matches!(
        workflow::next_step_for(store.as_ref(), 99).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_apply_once() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, now).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        let done = handle.await.expect("task").expect("completion");
        if done.applied {
            applied += 1;
        }
        assert!(done.ambulance.daily_check_completed);
    }
    assert_eq!(applied, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_steps_never_skip_a_predecessor() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let now = Utc::now();

    let review = {
        let store = store.clone();
        tokio::spawn(async move {
            workflow::complete_step(store.as_ref(), amb.id, StepKey::MechanicalReview, now).await
        })
    };
    let daily = {
        let store = store.clone();
        tokio::spawn(async move {
            workflow::complete_step(store.as_ref(), amb.id, StepKey::DailyCheck, now).await
        })
    };
    daily.await.expect("task").expect("daily check always succeeds");
    match review.await.expect("task") {
        Ok(done) => {
            assert!(done.applied);
            assert!(done.ambulance.daily_check_completed, "review landed before the daily check");
            assert!(done.ambulance.mechanical_review_completed);
        }
        Err(AppError::StepOutOfOrder { requested, .. }) => {
            assert_eq!(requested, StepKey::MechanicalReview);
        }
        Err(other) => panic!("unexpected error: {other:?}"),
    }

    let current = store.get_ambulance(amb.id).await.unwrap();
    assert!(current.daily_check_completed);
    assert!(!current.cleaning_completed);
}
