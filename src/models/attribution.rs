//! Attribution entity model
//!
//! This module contains the SeaORM entity model for the attributions table,
//! which links an order to the touchpoint(s) credited for it under one of the
//! fixed attribution models.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Attribution row; created only by the linker, never updated
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attributions")]
pub struct Model {
    /// Unique identifier for the attribution (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning order (internal id)
    pub order_id: Uuid,

    /// Credited touchpoint
    pub touchpoint_id: Uuid,

    /// Attribution model tag (`first_touch`, `last_touch`, `assisted`)
    pub model: String,

    /// Whole seconds between the touchpoint and the order
    pub time_to_purchase: i64,

    /// Timestamp when the linker persisted the row
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::touchpoint::Entity",
        from = "Column::TouchpointId",
        to = "super::touchpoint::Column::Id"
    )]
    Touchpoint,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::touchpoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Touchpoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed model tag; `None` for rows written with an unknown tag
    pub fn attribution_model(&self) -> Option<AttributionModel> {
        self.model.parse().ok()
    }
}

/// The fixed set of attribution models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttributionModel {
    /// Earliest attributable touchpoint in the window
    FirstTouch,
    /// Latest attributable touchpoint in the window
    LastTouch,
    /// Every touchpoint strictly between first and last
    Assisted,
}

impl AttributionModel {
    pub const ALL: [AttributionModel; 3] = [
        AttributionModel::FirstTouch,
        AttributionModel::LastTouch,
        AttributionModel::Assisted,
    ];

    /// Tag persisted in `attributions.model`
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionModel::FirstTouch => "first_touch",
            AttributionModel::LastTouch => "last_touch",
            AttributionModel::Assisted => "assisted",
        }
    }
}

impl fmt::Display for AttributionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown model tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attribution model '{0}'; expected first_touch, last_touch or assisted")]
pub struct UnknownAttributionModel(pub String);

impl FromStr for AttributionModel {
    type Err = UnknownAttributionModel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AttributionModel::ALL
            .into_iter()
            .find(|model| model.as_str() == value)
            .ok_or_else(|| UnknownAttributionModel(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tags_round_trip_through_from_str() {
        for model in AttributionModel::ALL {
            assert_eq!(model.as_str().parse::<AttributionModel>(), Ok(model));
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        let err = "linear".parse::<AttributionModel>().unwrap_err();
        assert_eq!(err, UnknownAttributionModel("linear".to_string()));
        assert!(err.to_string().contains("linear"));
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&AttributionModel::FirstTouch).unwrap();
        assert_eq!(json, "\"first_touch\"");
        let parsed: AttributionModel = serde_json::from_str("\"last_touch\"").unwrap();
        assert_eq!(parsed, AttributionModel::LastTouch);
    }
}
