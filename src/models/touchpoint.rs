//! Touchpoint entity model
//!
//! This module contains the SeaORM entity model for the touchpoints table,
//! which stores tracked visitor interactions carrying marketing metadata
//! (UTM parameters, ad click ids, referrer).

use super::visitor::Entity as Visitor;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Touchpoint entity; immutable once written by the ingestion path
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "touchpoints")]
pub struct Model {
    /// Unique identifier for the touchpoint (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Visitor that produced the interaction
    pub visitor_id: Uuid,

    /// Session the interaction belongs to, when the collector tracked one
    pub session_id: Option<Uuid>,

    /// Kind of tracked event (e.g., page_view, add_to_cart)
    pub event_type: String,

    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,

    /// Meta click id
    pub fbclid: Option<String>,
    /// TikTok click id
    pub ttclid: Option<String>,
    /// Google Ads click id
    pub gclid: Option<String>,
    /// Google Ads iOS web-to-app click id
    pub wbraid: Option<String>,
    /// Google Ads iOS app-to-web click id
    pub gbraid: Option<String>,
    /// Microsoft Ads click id
    pub msclkid: Option<String>,
    /// Snapchat click id
    pub sccid: Option<String>,

    /// Document referrer reported by the browser
    pub referrer: Option<String>,

    /// Full landing URL including the query string
    pub landing_url: Option<String>,

    /// When the interaction happened
    pub timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Visitor",
        from = "Column::VisitorId",
        to = "super::visitor::Column::Id"
    )]
    Visitor,
    #[sea_orm(has_many = "super::attribution::Entity")]
    Attribution,
}

impl Related<Visitor> for Entity {
    fn to() -> RelationDef {
        Relation::Visitor.def()
    }
}

impl Related<super::attribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
