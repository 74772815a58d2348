//! # Order Repository
//!
//! Read access to orders and their line items for the linker, the revenue
//! reports and the order listing.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::attribution::window::to_db_time;
use crate::models::order::{Column, Entity as Order, Model};
use crate::models::order_item;

/// Optional narrowing for the paginated order listing
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Inclusive lower bound on `created_at`
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub end: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

/// Repository for order database operations
pub struct OrderRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OrderRepository<'a, C> {
    /// Create a new OrderRepository over the given connection or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Find an order by its internal id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, DbErr> {
        Order::find_by_id(id).one(self.db).await
    }

    /// Find an order and hold a row lock on it until the transaction ends.
    ///
    /// Uses `SELECT ... FOR UPDATE` on Postgres. SQLite has no row locks and
    /// already serializes writers, so the lock clause is dropped there.
    pub async fn find_by_id_for_update(&self, id: Uuid) -> Result<Option<Model>, DbErr> {
        Order::find_by_id(id).lock_exclusive().one(self.db).await
    }

    /// List orders created inside `[start, end]`, optionally narrowed to one status
    ///
    /// Results are ordered by `created_at`, then `id`, so repeated report
    /// runs see orders in the same order.
    pub async fn list_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: Option<&str>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Order::find()
            .filter(Column::CreatedAt.between(to_db_time(start), to_db_time(end)))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id);

        if let Some(status_filter) = status {
            query = query.filter(Column::Status.eq(status_filter));
        }

        query.all(self.db).await
    }

    /// One page of orders, newest first, and the number of matching orders.
    ///
    /// `page` is 1-based.
    pub async fn list_paginated(
        &self,
        filter: &OrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Model>, u64), DbErr> {
        let mut query = Order::find();

        if let Some(start) = filter.start {
            query = query.filter(Column::CreatedAt.gte(to_db_time(start)));
        }
        if let Some(end) = filter.end {
            query = query.filter(Column::CreatedAt.lte(to_db_time(end)));
        }
        if let Some(status) = filter.status.as_deref() {
            query = query.filter(Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .paginate(self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    /// Line items of one order
    pub async fn find_items(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, DbErr> {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Title)
            .order_by_asc(order_item::Column::Id)
            .all(self.db)
            .await
    }
}
