//! Test utilities for database testing.
//!
//! This module provides an in-memory SQLite database with migrations applied
//! and small fixture builders for the event store tables.

use anyhow::Result;
use attribution::config::AppConfig;
use attribution::db;
use attribution::models::{order, order_item, touchpoint, visitor};
use chrono::{DateTime, FixedOffset};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection};
use uuid::Uuid;

/// Parse an RFC3339 timestamp into the stored representation.
#[allow(dead_code)]
pub fn ts(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).expect("valid RFC3339 timestamp")
}

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// Foreign keys stay enforced so cascade behaviour matches Postgres.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        ..Default::default()
    };

    let db = Database::connect(db::connect_options(&config)).await?;
    db::run_migrations(&db).await?;

    Ok(db)
}

/// Inserts a visitor and returns its id.
#[allow(dead_code)]
pub async fn insert_visitor(db: &DatabaseConnection) -> Result<Uuid> {
    let id = Uuid::new_v4();
    visitor::ActiveModel {
        id: Set(id),
        vid: Set(format!("vid-{}", id.simple())),
        created_at: Set(ts("2025-01-01T00:00:00Z")),
    }
    .insert(db)
    .await?;
    Ok(id)
}

/// A touchpoint with no attribution metadata; set fields before inserting.
#[allow(dead_code)]
pub fn touchpoint(visitor_id: Uuid, at: &str) -> touchpoint::ActiveModel {
    touchpoint::ActiveModel {
        id: Set(Uuid::new_v4()),
        visitor_id: Set(visitor_id),
        session_id: Set(None),
        event_type: Set("page_view".to_string()),
        utm_source: Set(None),
        utm_medium: Set(None),
        utm_campaign: Set(None),
        utm_content: Set(None),
        utm_term: Set(None),
        fbclid: Set(None),
        ttclid: Set(None),
        gclid: Set(None),
        wbraid: Set(None),
        gbraid: Set(None),
        msclkid: Set(None),
        sccid: Set(None),
        referrer: Set(None),
        landing_url: Set(Some("https://shop.example.com/".to_string())),
        timestamp: Set(ts(at)),
    }
}

/// Inserts a touchpoint tagged with `utm_source` (or a direct one for `None`).
#[allow(dead_code)]
pub async fn insert_touchpoint(
    db: &DatabaseConnection,
    visitor_id: Uuid,
    at: &str,
    utm_source: Option<&str>,
) -> Result<touchpoint::Model> {
    let mut tp = touchpoint(visitor_id, at);
    tp.utm_source = Set(utm_source.map(str::to_string));
    Ok(tp.insert(db).await?)
}

/// Inserts a touchpoint tagged with both `utm_source` and `utm_medium`.
#[allow(dead_code)]
pub async fn insert_campaign_touchpoint(
    db: &DatabaseConnection,
    visitor_id: Uuid,
    at: &str,
    source: &str,
    medium: &str,
    campaign: &str,
) -> Result<touchpoint::Model> {
    let mut tp = touchpoint(visitor_id, at);
    tp.utm_source = Set(Some(source.to_string()));
    tp.utm_medium = Set(Some(medium.to_string()));
    tp.utm_campaign = Set(Some(campaign.to_string()));
    Ok(tp.insert(db).await?)
}

/// Inserts an order with status `paid`.
#[allow(dead_code)]
pub async fn insert_order(
    db: &DatabaseConnection,
    visitor_id: Option<Uuid>,
    total_cost: f64,
    at: &str,
) -> Result<order::Model> {
    insert_order_with_status(db, visitor_id, total_cost, at, "paid").await
}

/// Inserts an order with an explicit status.
#[allow(dead_code)]
pub async fn insert_order_with_status(
    db: &DatabaseConnection,
    visitor_id: Option<Uuid>,
    total_cost: f64,
    at: &str,
    status: &str,
) -> Result<order::Model> {
    let id = Uuid::new_v4();
    let model = order::ActiveModel {
        id: Set(id),
        order_id: Set(format!("shop-{}", id.simple())),
        visitor_id: Set(visitor_id),
        total_cost: Set(total_cost),
        status: Set(status.to_string()),
        created_at: Set(ts(at)),
    }
    .insert(db)
    .await?;
    Ok(model)
}

/// Inserts a line item for an order.
#[allow(dead_code)]
pub async fn insert_order_item(
    db: &DatabaseConnection,
    order_id: Uuid,
    title: &str,
    quantity: i32,
    price: f64,
) -> Result<order_item::Model> {
    let model = order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(None),
        title: Set(title.to_string()),
        quantity: Set(quantity),
        price: Set(price),
    }
    .insert(db)
    .await?;
    Ok(model)
}
