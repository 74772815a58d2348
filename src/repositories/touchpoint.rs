//! # Touchpoint Repository
//!
//! Window scans over a visitor's touchpoints and batched lookups by id.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use super::IN_CLAUSE_CHUNK;
use crate::attribution::window::to_db_time;
use crate::models::touchpoint::{Column, Entity as Touchpoint, Model};

/// Columns whose presence makes a touchpoint attributable
const ATTRIBUTION_SIGNALS: [Column; 10] = [
    Column::UtmSource,
    Column::UtmMedium,
    Column::Fbclid,
    Column::Ttclid,
    Column::Gclid,
    Column::Wbraid,
    Column::Gbraid,
    Column::Msclkid,
    Column::Sccid,
    Column::Referrer,
];

/// At least one signal column is non-null and not blank.
fn attributable() -> Condition {
    ATTRIBUTION_SIGNALS
        .into_iter()
        .fold(Condition::any(), |any, column| {
            any.add(
                Condition::all().add(column.is_not_null()).add(
                    Expr::expr(Func::cust(Alias::new("TRIM")).arg(Expr::col(column))).ne(""),
                ),
            )
        })
}

/// Repository for touchpoint database operations
pub struct TouchpointRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TouchpointRepository<'a, C> {
    /// Create a new TouchpointRepository over the given connection or transaction
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Attributable touchpoints of one visitor with `timestamp` in `[start, end]`,
    /// ascending. Direct touchpoints are filtered in the query so they never
    /// count against `limit`.
    ///
    /// At most `limit` rows are returned; when a visitor has more, the most
    /// recent ones are kept. The second element reports whether the cap hit.
    pub async fn find_attributable_in_window(
        &self,
        visitor_id: Uuid,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        limit: u64,
    ) -> Result<(Vec<Model>, bool), DbErr> {
        let mut touchpoints = Touchpoint::find()
            .filter(Column::VisitorId.eq(visitor_id))
            .filter(Column::Timestamp.between(to_db_time(start), to_db_time(end)))
            .filter(attributable())
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
            .limit(limit.saturating_add(1))
            .all(self.db)
            .await?;

        let capped = touchpoints.len() as u64 > limit;
        touchpoints.truncate(limit as usize);
        touchpoints.reverse();

        Ok((touchpoints, capped))
    }

    /// Load touchpoints by id, keyed by id
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Model>, DbErr> {
        let mut found = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
            let rows = Touchpoint::find()
                .filter(Column::Id.is_in(chunk.iter().copied()))
                .all(self.db)
                .await?;
            found.extend(rows.into_iter().map(|tp| (tp.id, tp)));
        }

        Ok(found)
    }
}
