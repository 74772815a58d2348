//! Order to touchpoint linking.
//!
//! The linker materializes attribution rows for one order: a `first_touch`
//! and a `last_touch` row plus an `assisted` row per interior touchpoint.
//! Rows are written once and frozen; [`Linker::relink`] is the only way to
//! recompute them.

use chrono::{DateTime, FixedOffset, Utc};
use metrics::counter;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::window::{is_direct, time_to_purchase, to_db_time, window_start};
use crate::error::{AttributionError, is_unique_violation};
use crate::models::{AttributionModel, attribution, order, touchpoint};
use crate::repositories::{AttributionRepository, OrderRepository, TouchpointRepository};

/// Explicit linking parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOptions {
    /// Attribution window length in days
    pub window_days: u32,
    /// Upper bound on candidate touchpoints scanned per order
    pub max_touchpoints: u64,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_touchpoints: 500,
        }
    }
}

/// An attribution row before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAttribution {
    pub touchpoint_id: Uuid,
    pub model: AttributionModel,
    pub time_to_purchase: i64,
}

/// Split the time-ordered candidates of one order across the three models.
///
/// Direct touchpoints are dropped first. A single remaining touchpoint gets
/// both a `first_touch` and a `last_touch` row.
pub fn plan_attributions(
    order_created_at: DateTime<FixedOffset>,
    candidates: &[touchpoint::Model],
) -> Vec<PlannedAttribution> {
    let attributable: Vec<&touchpoint::Model> =
        candidates.iter().filter(|tp| !is_direct(tp)).collect();

    let (Some(first), Some(last)) = (attributable.first(), attributable.last()) else {
        return Vec::new();
    };

    let planned = |tp: &touchpoint::Model, model| PlannedAttribution {
        touchpoint_id: tp.id,
        model,
        time_to_purchase: time_to_purchase(order_created_at, tp.timestamp),
    };

    let mut rows = Vec::with_capacity(attributable.len().max(2));
    rows.push(planned(first, AttributionModel::FirstTouch));
    if attributable.len() > 2 {
        rows.extend(
            attributable[1..attributable.len() - 1]
                .iter()
                .map(|tp| planned(tp, AttributionModel::Assisted)),
        );
    }
    rows.push(planned(last, AttributionModel::LastTouch));
    rows
}

/// Links orders to the touchpoints that preceded them
#[derive(Clone)]
pub struct Linker {
    db: DatabaseConnection,
    options: LinkOptions,
}

impl Linker {
    pub fn new(db: DatabaseConnection, options: LinkOptions) -> Self {
        Self { db, options }
    }

    /// Link an order, or return its existing rows untouched if it has any.
    ///
    /// The order row is locked before the existence check and the inserts
    /// share the same transaction, so a failure leaves no partial set behind
    /// and concurrent callers end up with a single set of rows.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn link(&self, order_id: Uuid) -> Result<Vec<attribution::Model>, AttributionError> {
        let txn = self.db.begin().await?;

        let order = OrderRepository::new(&txn)
            .find_by_id_for_update(order_id)
            .await?
            .ok_or(AttributionError::NotFound { order_id })?;

        let existing = AttributionRepository::new(&txn)
            .list_for_order(order.id)
            .await?;
        if !existing.is_empty() {
            txn.commit().await?;
            counter!("attribution_links_total", "outcome" => "skipped").increment(1);
            debug!(rows = existing.len(), "order already linked");
            return Ok(existing);
        }

        self.link_in(txn, &order).await
    }

    /// Drop an order's attribution rows and link it again.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn relink(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<attribution::Model>, AttributionError> {
        let txn = self.db.begin().await?;

        let order = OrderRepository::new(&txn)
            .find_by_id_for_update(order_id)
            .await?
            .ok_or(AttributionError::NotFound { order_id })?;

        let removed = AttributionRepository::new(&txn)
            .delete_for_order(order.id)
            .await?;
        info!(removed, "cleared attribution rows for relink");

        self.link_in(txn, &order).await
    }

    async fn link_in(
        &self,
        txn: DatabaseTransaction,
        order: &order::Model,
    ) -> Result<Vec<attribution::Model>, AttributionError> {
        let planned = self.plan_for(&txn, order).await?;

        if planned.is_empty() {
            txn.commit().await?;
            counter!("attribution_links_total", "outcome" => "direct").increment(1);
            debug!("no attributable touchpoints in window");
            return Ok(Vec::new());
        }

        let created_at = to_db_time(Utc::now());
        let rows: Vec<attribution::ActiveModel> = planned
            .iter()
            .map(|row| attribution::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                touchpoint_id: Set(row.touchpoint_id),
                model: Set(row.model.as_str().to_string()),
                time_to_purchase: Set(row.time_to_purchase),
                created_at: Set(created_at),
            })
            .collect();

        let repo = AttributionRepository::new(&txn);
        let outcome = repo.insert_ignoring_conflicts(rows).await;

        match outcome {
            Ok(inserted) => {
                let persisted = repo.list_for_order(order.id).await?;

                // Rows outside our plan were committed by another linker that
                // saw a different candidate list; its set wins.
                if let Some(foreign) = persisted.iter().find(|row| !is_planned(&planned, row)) {
                    warn!(
                        touchpoint_id = %foreign.touchpoint_id,
                        model = %foreign.model,
                        "concurrent link detected; keeping the persisted row set"
                    );
                    txn.rollback().await?;
                    return self.persisted_after_conflict(order.id).await;
                }

                txn.commit().await?;

                counter!("attribution_links_total", "outcome" => "linked").increment(1);
                counter!("attribution_rows_created_total").increment(inserted);
                info!(rows = persisted.len(), inserted, "order linked");
                Ok(persisted)
            }
            // Another linker committed a different first/last row for this order.
            Err(err) if is_unique_violation(&err) => {
                warn!(error = %err, "concurrent link detected; returning persisted rows");
                txn.rollback().await?;
                self.persisted_after_conflict(order.id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn persisted_after_conflict(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<attribution::Model>, AttributionError> {
        counter!("attribution_links_total", "outcome" => "skipped").increment(1);
        Ok(AttributionRepository::new(&self.db)
            .list_for_order(order_id)
            .await?)
    }

    async fn plan_for<C: ConnectionTrait>(
        &self,
        db: &C,
        order: &order::Model,
    ) -> Result<Vec<PlannedAttribution>, DbErr> {
        let Some(visitor_id) = order.visitor_id else {
            debug!("order has no visitor; identity resolution is not attempted");
            return Ok(Vec::new());
        };

        let start = window_start(order.created_at, self.options.window_days);
        let (candidates, capped) = TouchpointRepository::new(db)
            .find_attributable_in_window(
                visitor_id,
                start,
                order.created_at,
                self.options.max_touchpoints,
            )
            .await?;

        if capped {
            warn!(
                visitor_id = %visitor_id,
                max_touchpoints = self.options.max_touchpoints,
                "touchpoint scan cap reached; keeping the most recent attributable touchpoints"
            );
        }

        Ok(plan_attributions(order.created_at, &candidates))
    }
}

fn is_planned(planned: &[PlannedAttribution], row: &attribution::Model) -> bool {
    planned.iter().any(|p| {
        p.touchpoint_id == row.touchpoint_id && row.attribution_model() == Some(p.model)
    })
}
