//! Visitor entity model
//!
//! A visitor is the long-lived browser identity created on first event.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Visitor entity keyed by the opaque `vid` the tracking snippet persists
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "visitors")]
pub struct Model {
    /// Unique identifier for the visitor (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque stable identifier issued to the browser
    #[sea_orm(unique)]
    pub vid: String,

    /// Timestamp when the visitor was first seen
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::touchpoint::Entity")]
    Touchpoint,
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::touchpoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Touchpoint.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
