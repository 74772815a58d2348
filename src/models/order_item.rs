//! OrderItem entity model

use super::order::Entity as Order;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Line item belonging to an order; deleted with its order
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub order_id: Uuid,

    /// Product identifier at the order source
    pub product_id: Option<String>,

    pub title: String,

    pub quantity: i32,

    /// Unit price in the shop currency
    pub price: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Order",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<Order> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
