//! Integration tests for the migrated schema: cascades and attribution guards.

use anyhow::Result;
use attribution::error::is_unique_violation;
use attribution::models::{Attribution, Order, OrderItem, Visitor, attribution as attribution_row};
use attribution::repositories::AttributionRepository;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveValue::Set, EntityTrait, ModelTrait, PaginatorTrait};
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    insert_order, insert_order_item, insert_touchpoint, insert_visitor, setup_test_db,
};

fn row(order_id: Uuid, touchpoint_id: Uuid, model: &str) -> attribution_row::ActiveModel {
    attribution_row::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        touchpoint_id: Set(touchpoint_id),
        model: Set(model.to_string()),
        time_to_purchase: Set(3_600),
        created_at: Set(Utc::now().fixed_offset()),
    }
}

#[tokio::test]
async fn all_migrations_apply() -> Result<()> {
    let db = setup_test_db().await?;

    let applied = Migrator::get_applied_migrations(&db).await?;
    assert_eq!(applied.len(), Migrator::migrations().len());
    Ok(())
}

#[tokio::test]
async fn deleting_an_order_cascades_to_items_and_attributions() -> Result<()> {
    let db = setup_test_db().await?;
    let visitor = insert_visitor(&db).await?;
    let tp = insert_touchpoint(&db, visitor, "2025-01-09T10:00:00Z", Some("google")).await?;
    let order = insert_order(&db, Some(visitor), 25.0, "2025-01-10T10:00:00Z").await?;
    insert_order_item(&db, order.id, "Wool socks", 2, 12.5).await?;

    let repo = AttributionRepository::new(&db);
    repo.insert_ignoring_conflicts(vec![
        row(order.id, tp.id, "first_touch"),
        row(order.id, tp.id, "last_touch"),
    ])
    .await?;
    assert_eq!(Attribution::find().count(&db).await?, 2);

    order.delete(&db).await?;

    assert_eq!(OrderItem::find().count(&db).await?, 0);
    assert_eq!(Attribution::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn deleting_a_visitor_detaches_orders() -> Result<()> {
    let db = setup_test_db().await?;
    let visitor = insert_visitor(&db).await?;
    let order = insert_order(&db, Some(visitor), 25.0, "2025-01-10T10:00:00Z").await?;

    Visitor::delete_by_id(visitor).exec(&db).await?;

    let reloaded = Order::find_by_id(order.id).one(&db).await?.expect("order kept");
    assert_eq!(reloaded.visitor_id, None);
    Ok(())
}

#[tokio::test]
async fn duplicate_rows_are_ignored() -> Result<()> {
    let db = setup_test_db().await?;
    let visitor = insert_visitor(&db).await?;
    let tp = insert_touchpoint(&db, visitor, "2025-01-09T10:00:00Z", Some("google")).await?;
    let order = insert_order(&db, Some(visitor), 25.0, "2025-01-10T10:00:00Z").await?;
    let repo = AttributionRepository::new(&db);

    let first = repo
        .insert_ignoring_conflicts(vec![row(order.id, tp.id, "first_touch")])
        .await?;
    let again = repo
        .insert_ignoring_conflicts(vec![row(order.id, tp.id, "first_touch")])
        .await?;

    assert_eq!(first, 1);
    assert_eq!(again, 0);
    assert_eq!(repo.list_for_order(order.id).await?.len(), 1);
    assert_eq!(repo.insert_ignoring_conflicts(Vec::new()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn second_first_touch_row_is_rejected() -> Result<()> {
    let db = setup_test_db().await?;
    let visitor = insert_visitor(&db).await?;
    let tp_a = insert_touchpoint(&db, visitor, "2025-01-08T10:00:00Z", Some("facebook")).await?;
    let tp_b = insert_touchpoint(&db, visitor, "2025-01-09T10:00:00Z", Some("google")).await?;
    let order = insert_order(&db, Some(visitor), 25.0, "2025-01-10T10:00:00Z").await?;
    let repo = AttributionRepository::new(&db);

    repo.insert_ignoring_conflicts(vec![row(order.id, tp_a.id, "first_touch")])
        .await?;
    let err = repo
        .insert_ignoring_conflicts(vec![row(order.id, tp_b.id, "first_touch")])
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err), "unexpected error: {err:?}");

    // Assisted rows are not limited to one per order.
    let inserted = repo
        .insert_ignoring_conflicts(vec![
            row(order.id, tp_a.id, "assisted"),
            row(order.id, tp_b.id, "assisted"),
        ])
        .await?;
    assert_eq!(inserted, 2);
    Ok(())
}
