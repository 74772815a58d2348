//! # Data Models
//!
//! SeaORM entities for the event store tables the attribution engine reads
//! and writes, plus small shared response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod attribution;
pub mod order;
pub mod order_item;
pub mod session;
pub mod touchpoint;
pub mod visitor;

pub use attribution::AttributionModel;
pub use attribution::Entity as Attribution;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use touchpoint::Entity as Touchpoint;
pub use visitor::Entity as Visitor;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "attribution".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
