//! Order entity model
//!
//! Orders arrive through webhook ingestion. `visitor_id` is only present when
//! the storefront forwarded the tracking visitor with the checkout.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Order entity representing one ecommerce purchase
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Internal identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Identifier assigned by the order source
    #[sea_orm(unique)]
    pub order_id: String,

    /// Visitor that placed the order, when known
    pub visitor_id: Option<Uuid>,

    /// Order total in the shop currency
    pub total_cost: f64,

    /// Order status as reported by the source (e.g., paid, refunded)
    pub status: String,

    /// Timestamp when the order was created at the source
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::visitor::Entity",
        from = "Column::VisitorId",
        to = "super::visitor::Column::Id"
    )]
    Visitor,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::attribution::Entity")]
    Attribution,
}

impl Related<super::visitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visitor.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::attribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
