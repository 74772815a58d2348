//! # Attribution Repository
//!
//! Reads and idempotent writes for attribution rows. Inserts are
//! insert-or-ignore against `idx_attributions_order_model_touchpoint`.

use std::cmp::Reverse;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use super::IN_CLAUSE_CHUNK;
use crate::models::AttributionModel;
use crate::models::attribution::{ActiveModel, Column, Entity as Attribution, Model};

/// Repository for attribution database operations
pub struct AttributionRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AttributionRepository<'a, C> {
    /// Create a new AttributionRepository over the given connection or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Whether any attribution row exists for the order
    pub async fn exists_for_order(&self, order_id: Uuid) -> Result<bool, DbErr> {
        let count = Attribution::find()
            .filter(Column::OrderId.eq(order_id))
            .count(self.db)
            .await?;
        Ok(count > 0)
    }

    /// All rows of one order in canonical order: first_touch, assisted
    /// (earliest first), last_touch.
    pub async fn list_for_order(&self, order_id: Uuid) -> Result<Vec<Model>, DbErr> {
        let mut rows = Attribution::find()
            .filter(Column::OrderId.eq(order_id))
            .order_by_desc(Column::TimeToPurchase)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?;

        rows.sort_by_key(|row| (model_rank(row), Reverse(row.time_to_purchase)));
        Ok(rows)
    }

    /// Rows of the given model for a batch of orders.
    ///
    /// Within an order, rows come back earliest touchpoint first (largest
    /// `time_to_purchase`), tie-broken by id.
    pub async fn list_for_orders(
        &self,
        order_ids: &[Uuid],
        model: AttributionModel,
    ) -> Result<Vec<Model>, DbErr> {
        let mut rows = Vec::new();

        for chunk in order_ids.chunks(IN_CLAUSE_CHUNK) {
            let batch = Attribution::find()
                .filter(Column::OrderId.is_in(chunk.iter().copied()))
                .filter(Column::Model.eq(model.as_str()))
                .order_by_asc(Column::OrderId)
                .order_by_desc(Column::TimeToPurchase)
                .order_by_asc(Column::Id)
                .all(self.db)
                .await?;
            rows.extend(batch);
        }

        Ok(rows)
    }

    /// Insert rows, silently skipping any that already exist.
    ///
    /// Returns the number of rows actually written.
    pub async fn insert_ignoring_conflicts(&self, rows: Vec<ActiveModel>) -> Result<u64, DbErr> {
        if rows.is_empty() {
            return Ok(0);
        }

        Attribution::insert_many(rows)
            .on_conflict(
                OnConflict::columns([Column::OrderId, Column::Model, Column::TouchpointId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await
    }

    /// Delete every row of an order; returns the number removed
    pub async fn delete_for_order(&self, order_id: Uuid) -> Result<u64, DbErr> {
        let result = Attribution::delete_many()
            .filter(Column::OrderId.eq(order_id))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn model_rank(row: &Model) -> u8 {
    match row.attribution_model() {
        Some(AttributionModel::FirstTouch) => 0,
        Some(AttributionModel::Assisted) => 1,
        Some(AttributionModel::LastTouch) => 2,
        None => 3,
    }
}
