mod common;
use common::*;

use ambufleet::errors::AppError;
use ambufleet::models::material::{
    AdministrationRoute, AmbulanceMaterialInput, CentralMaterialInput, MaterialFilter,
    MaterialKind, MaterialOwner,
};
use ambufleet::store::{AmbulanceStore, MaterialStore, SpaceStore};

#[tokio::test]
async fn test_space_with_materials_cannot_be_deleted() {
    let store = store();
    let space = add_space(&store, "Farmacia").await;
    let m = add_central_material(&store, space.id, "Adrenalina", 4, None, None).await;

    match store.delete_space(space.id).await {
        Err(AppError::Conflict(msg)) => assert!(msg.contains("1 material")),
        other => panic!("expected Conflict, got {other:?}"),
    }

    store.delete_material(m.reference()).await.unwrap();
    store.delete_space(space.id).await.expect("empty space deletes");
    assert!(matches!(store.get_space(space.id).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_space_names_are_unique() {
    let store = store();
    add_space(&store, "Farmacia").await;
    let other = add_space(&store, "Almacen").await;

    assert!(matches!(store.create_space("Farmacia").await, Err(AppError::Conflict(_))));
    assert!(matches!(
        store.rename_space(other.id, "Farmacia").await,
        Err(AppError::Conflict(_))
    ));
    let renamed = store.rename_space(other.id, "Almacen 2").await.unwrap();
    assert_eq!(renamed.name, "Almacen 2");
}

#[tokio::test]
async fn test_adjust_quantity_never_goes_negative() {
    let store = store();
    let amb = add_ambulance(&store, "Alfa 1", "1234-ABC").await;
    let m = add_ambulance_material(&store, amb.id, "Gauze", 3, Some(1), None).await;

    let after = store.adjust_quantity(m.reference(), -2).await.unwrap();
    assert_eq!(after.quantity, 1);

    match store.adjust_quantity(m.reference(), -5).await {
        Err(AppError::InvalidInput(msg)) => assert!(msg.contains("only 1 in stock")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
    let unchanged = store.get_material(m.reference()).await.unwrap();
    assert_eq!(unchanged.quantity, 1);

    let restocked = store.adjust_quantity(m.reference(), 10).await.unwrap();
    assert_eq!(restocked.quantity, 11);
}

#[tokio::test]
async fn test_adjust_quantity_rejects_out_of_range_deltas() {
    let store = store();
    let space = add_space(&store, "Farmacia").await;
    let m = add_central_material(&store, space.id, "Adrenalina", 5, None, None).await;

    assert!(matches!(
        store.adjust_quantity(m.reference(), i64::MAX).await,
        Err(AppError::InvalidInput(_))
    ));
    match store.adjust_quantity(m.reference(), i64::MIN).await {
        Err(AppError::InvalidInput(msg)) => {
            assert!(msg.contains(&i64::MIN.unsigned_abs().to_string()), "{msg}");
            assert!(msg.contains("only 5 in stock"));
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }

    let unchanged = store.get_material(m.reference()).await.unwrap();
    assert_eq!(unchanged.quantity, 5);
    let restocked = store.adjust_quantity(m.reference(), 1).await.unwrap();
    assert_eq!(restocked.quantity, 6);
}

#[tokio::test]
async fn test_material_owner_must_exist() {
    let store = store();
    let input = AmbulanceMaterialInput {
        name: "Gauze".into(),
        quantity: 2,
        expiry_date: None,
        min_stock_level: None,
        category: None,
        location: None,
        ambulance_id: None,
    };
    let draft = input.into_draft(77).unwrap();
    assert!(matches!(store.create_material(&draft).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_central_material_moves_between_spaces() {
    let store = store();
    let farmacia = add_space(&store, "Farmacia").await;
    let almacen = add_space(&store, "Almacen").await;
    let m = add_central_material(&store, farmacia.id, "Atropina", 6, Some(2), None).await;

    let input = CentralMaterialInput {
        name: "Atropina".into(),
        dose: "0.5mg".into(),
        unit: "ampolla".into(),
        route: AdministrationRoute::IvIm,
        quantity: 6,
        expiry_date: Some("2027-02-01".into()),
        min_stock_level: Some(2),
        space_id: Some(almacen.id),
    };
    let moved = store
        .update_material(m.id, &input.into_draft(farmacia.id).unwrap())
        .await
        .unwrap();
    assert_eq!(moved.space_id(), Some(almacen.id));
    assert_eq!(moved.kind(), MaterialKind::Central);

    let in_farmacia = store.list_materials(MaterialFilter::Central(Some(farmacia.id))).await.unwrap();
    assert!(in_farmacia.is_empty());
    store.delete_space(farmacia.id).await.expect("now empty");
}

#[tokio::test]
async fn test_listing_filters_by_owner() {
    let store = store();
    let a = add_ambulance(&store, "Alfa 1", "1111-AAA").await;
    let b = add_ambulance(&store, "Bravo 2", "2222-BBB").await;
    let space = add_space(&store, "Farmacia").await;
    add_ambulance_material(&store, a.id, "Vendas", 4, None, None).await;
    add_ambulance_material(&store, a.id, "Apositos", 4, None, None).await;
    add_ambulance_material(&store, b.id, "Guantes", 4, None, None).await;
    add_central_material(&store, space.id, "Adrenalina", 4, None, None).await;

    let for_a = store.list_materials(MaterialFilter::Ambulance(Some(a.id))).await.unwrap();
    let names: Vec<&str> = for_a.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Apositos", "Vendas"]);

    let all = store.list_materials(MaterialFilter::All).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(matches!(all.last().map(|m| &m.owner), Some(MaterialOwner::Central { .. })));

    let central = store.list_materials(MaterialFilter::Central(None)).await.unwrap();
    assert_eq!(central.len(), 1);
}

#[tokio::test]
async fn test_update_rejects_duplicate_plate() {
    let store = store();
    add_ambulance(&store, "Alfa 1", "1111-AAA").await;
    let b = add_ambulance(&store, "Bravo 2", "2222-BBB").await;

    let input = ambufleet::models::ambulance::AmbulanceInput {
        name: "Bravo 2".into(),
        plate: "1111-AAA".into(),
        model: String::new(),
        year: 2020,
    };
    assert!(matches!(
        store.update_ambulance(b.id, &input).await,
        Err(AppError::Conflict(_))
    ));
}
