//! # Order Handlers
//!
//! Order listing and detail views with their attribution paths, plus the
//! administrative link action.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::reports::{ensure_ordered, optional_bound, status_filter};
use crate::error::{ApiError, AttributionError, validation_error};
use crate::models::{AttributionModel, attribution, order, order_item, touchpoint};
use crate::repositories::{AttributionRepository, OrderFilter, OrderRepository, TouchpointRepository};
use crate::server::AppState;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 100;

/// Query parameters for the link action
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LinkParams {
    /// Discard existing rows and link again
    #[serde(default)]
    pub force: bool,
}

/// Query parameters for the order listing
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Orders per page (default 50, max 100)
    pub limit: Option<u64>,
    /// Inclusive start, `YYYY-MM-DD` or RFC3339
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM-DD` (whole day) or RFC3339
    pub end_date: Option<String>,
    /// Optional order status filter
    pub status: Option<String>,
}

/// One attribution row
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttributionInfo {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "550e8400-e29b-41d4-a716-446655440001")]
    pub touchpoint_id: String,
    #[schema(example = "first_touch")]
    pub model: String,
    /// Whole seconds between the touchpoint and the order
    #[schema(example = 86400)]
    pub time_to_purchase: i64,
    #[schema(example = "2025-01-10T12:00:00+00:00")]
    pub created_at: String,
}

impl From<attribution::Model> for AttributionInfo {
    fn from(model: attribution::Model) -> Self {
        Self {
            id: model.id.to_string(),
            touchpoint_id: model.touchpoint_id.to_string(),
            model: model.model,
            time_to_purchase: model.time_to_purchase,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Attribution rows of one order
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderAttributions {
    pub order_id: String,
    /// True when no attributable touchpoint was found
    pub direct: bool,
    pub attributions: Vec<AttributionInfo>,
}

impl OrderAttributions {
    fn new(order_id: Uuid, rows: Vec<attribution::Model>) -> Self {
        Self {
            order_id: order_id.to_string(),
            direct: rows.is_empty(),
            attributions: rows.into_iter().map(AttributionInfo::from).collect(),
        }
    }
}

/// Marketing metadata of a credited touchpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TouchpointInfo {
    pub id: String,
    #[schema(example = "page_view")]
    pub event_type: String,
    #[schema(example = "google")]
    pub utm_source: Option<String>,
    #[schema(example = "cpc")]
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub fbclid: Option<String>,
    pub ttclid: Option<String>,
    pub gclid: Option<String>,
    pub wbraid: Option<String>,
    pub gbraid: Option<String>,
    pub msclkid: Option<String>,
    pub sccid: Option<String>,
    pub referrer: Option<String>,
    pub landing_url: Option<String>,
    #[schema(example = "2025-01-09T12:00:00+00:00")]
    pub timestamp: String,
}

impl From<touchpoint::Model> for TouchpointInfo {
    fn from(tp: touchpoint::Model) -> Self {
        Self {
            id: tp.id.to_string(),
            event_type: tp.event_type,
            utm_source: tp.utm_source,
            utm_medium: tp.utm_medium,
            utm_campaign: tp.utm_campaign,
            utm_content: tp.utm_content,
            utm_term: tp.utm_term,
            fbclid: tp.fbclid,
            ttclid: tp.ttclid,
            gclid: tp.gclid,
            wbraid: tp.wbraid,
            gbraid: tp.gbraid,
            msclkid: tp.msclkid,
            sccid: tp.sccid,
            referrer: tp.referrer,
            landing_url: tp.landing_url,
            timestamp: tp.timestamp.to_rfc3339(),
        }
    }
}

/// An attribution row together with the touchpoint it credits
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttributedTouchpoint {
    pub attribution: AttributionInfo,
    pub touchpoint: TouchpointInfo,
}

impl AttributedTouchpoint {
    fn new(
        row: attribution::Model,
        touchpoints: &HashMap<Uuid, touchpoint::Model>,
    ) -> Option<Self> {
        let tp = touchpoints.get(&row.touchpoint_id)?.clone();
        Some(Self {
            attribution: AttributionInfo::from(row),
            touchpoint: TouchpointInfo::from(tp),
        })
    }
}

/// Order fields shared by the listing and the detail view
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderInfo {
    pub id: String,
    /// Identifier assigned by the order source
    #[schema(example = "1001")]
    pub order_id: String,
    pub visitor_id: Option<String>,
    #[schema(example = 99.5)]
    pub total_cost: f64,
    #[schema(example = "paid")]
    pub status: String,
    #[schema(example = "2025-01-10T12:00:00+00:00")]
    pub created_at: String,
}

impl From<order::Model> for OrderInfo {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id.to_string(),
            order_id: model.order_id,
            visitor_id: model.visitor_id.map(|id| id.to_string()),
            total_cost: model.total_cost,
            status: model.status,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Order line item
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemInfo {
    pub id: String,
    pub product_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price: f64,
}

impl From<order_item::Model> for OrderItemInfo {
    fn from(model: order_item::Model) -> Self {
        Self {
            id: model.id.to_string(),
            product_id: model.product_id,
            title: model.title,
            quantity: model.quantity,
            price: model.price,
        }
    }
}

/// Order in the listing with its last-touch credit, if linked
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub order: OrderInfo,
    pub last_touch: Option<AttributedTouchpoint>,
}

/// Page metadata for the order listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    /// Number of orders matching the filters
    pub total: u64,
    pub pages: u64,
}

/// One page of orders, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderPage {
    pub orders: Vec<OrderSummary>,
    pub pagination: Pagination,
}

/// Order with its items and full attribution path
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub order: OrderInfo,
    pub items: Vec<OrderItemInfo>,
    /// True when no attributable touchpoint was found
    pub direct: bool,
    /// Credited touchpoints, earliest first
    pub attributions: Vec<AttributedTouchpoint>,
}

impl OrderDetail {
    fn new(
        order: order::Model,
        items: Vec<order_item::Model>,
        rows: Vec<attribution::Model>,
        touchpoints: &HashMap<Uuid, touchpoint::Model>,
    ) -> Self {
        let mut credited: Vec<(attribution::Model, &touchpoint::Model)> = rows
            .into_iter()
            .filter_map(|row| {
                let tp = touchpoints.get(&row.touchpoint_id)?;
                Some((row, tp))
            })
            .collect();
        // Stable, so a touchpoint credited twice keeps first_touch before last_touch.
        credited.sort_by_key(|(_, tp)| tp.timestamp);

        let path: Vec<AttributedTouchpoint> = credited
            .into_iter()
            .map(|(row, tp)| AttributedTouchpoint {
                attribution: AttributionInfo::from(row),
                touchpoint: TouchpointInfo::from(tp.clone()),
            })
            .collect();

        Self {
            order: OrderInfo::from(order),
            items: items.into_iter().map(OrderItemInfo::from).collect(),
            direct: path.is_empty(),
            attributions: path,
        }
    }
}

fn parse_order_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        validation_error("Invalid order id", json!({ "id": "Must be a valid UUID" }))
    })
}

fn page_size(limit: Option<u64>) -> Result<u64, ApiError> {
    match limit {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(0) => Err(validation_error(
            "Invalid limit",
            json!({ "limit": "Minimum allowed limit is 1" }),
        )),
        Some(value) if value > MAX_PAGE_SIZE => Err(validation_error(
            "Invalid limit",
            json!({ "limit": format!("Maximum allowed limit is {MAX_PAGE_SIZE}") }),
        )),
        Some(value) => Ok(value),
    }
}

/// List orders newest first, each with its last-touch credit
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "One page of orders", body = OrderPage),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<OrderPage>, ApiError> {
    let page = params.page.unwrap_or(1);
    if page == 0 {
        return Err(validation_error(
            "Invalid page",
            json!({ "page": "Minimum allowed page is 1" }),
        ));
    }
    let limit = page_size(params.limit)?;

    let start = optional_bound("start_date", params.start_date.as_deref(), false)?;
    let end = optional_bound("end_date", params.end_date.as_deref(), true)?;
    if let (Some(start), Some(end)) = (start, end) {
        ensure_ordered(start, end)?;
    }

    let filter = OrderFilter {
        start,
        end,
        status: status_filter(params.status),
    };
    let (orders, total) = OrderRepository::new(&state.db)
        .list_paginated(&filter, page, limit)
        .await?;

    // Listing never links; unlinked orders show no credit.
    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let rows = AttributionRepository::new(&state.db)
        .list_for_orders(&ids, AttributionModel::LastTouch)
        .await?;
    let touchpoint_ids: Vec<Uuid> = rows.iter().map(|row| row.touchpoint_id).collect();
    let touchpoints = TouchpointRepository::new(&state.db)
        .find_by_ids(&touchpoint_ids)
        .await?;

    let mut last_touch: HashMap<Uuid, attribution::Model> = HashMap::with_capacity(rows.len());
    for row in rows {
        last_touch.entry(row.order_id).or_insert(row);
    }

    let orders = orders
        .into_iter()
        .map(|order| OrderSummary {
            last_touch: last_touch
                .remove(&order.id)
                .and_then(|row| AttributedTouchpoint::new(row, &touchpoints)),
            order: OrderInfo::from(order),
        })
        .collect();

    Ok(Json(OrderPage {
        orders,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        },
    }))
}

/// Order detail; links the order first if it has no attribution rows yet
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = String, Path, description = "Order id (UUID)")
    ),
    responses(
        (status = 200, description = "Order with items and attribution path", body = OrderDetail),
        (status = 400, description = "Invalid order id", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let rows = state.linker.link(order_id).await?;

    let orders = OrderRepository::new(&state.db);
    let order = orders
        .find_by_id(order_id)
        .await?
        .ok_or(AttributionError::NotFound { order_id })?;
    let items = orders.find_items(order_id).await?;

    let touchpoint_ids: Vec<Uuid> = rows.iter().map(|row| row.touchpoint_id).collect();
    let touchpoints = TouchpointRepository::new(&state.db)
        .find_by_ids(&touchpoint_ids)
        .await?;

    Ok(Json(OrderDetail::new(order, items, rows, &touchpoints)))
}

/// Link an order now, or re-link it with `force=true`
#[utoipa::path(
    post,
    path = "/orders/{id}/attributions",
    params(
        ("id" = String, Path, description = "Order id (UUID)"),
        LinkParams
    ),
    responses(
        (status = 200, description = "Attribution rows persisted for the order", body = OrderAttributions),
        (status = 400, description = "Invalid order id", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn link_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LinkParams>,
) -> Result<Json<OrderAttributions>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let rows = if params.force {
        state.linker.relink(order_id).await?
    } else {
        state.linker.link(order_id).await?
    };

    Ok(Json(OrderAttributions::new(order_id, rows)))
}

/// List an order's attribution rows without linking
#[utoipa::path(
    get,
    path = "/orders/{id}/attributions",
    params(
        ("id" = String, Path, description = "Order id (UUID)")
    ),
    responses(
        (status = 200, description = "Attribution rows of the order", body = OrderAttributions),
        (status = 400, description = "Invalid order id", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn get_order_attributions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderAttributions>, ApiError> {
    let order_id = parse_order_id(&id)?;

    let order = OrderRepository::new(&state.db)
        .find_by_id(order_id)
        .await?
        .ok_or(AttributionError::NotFound { order_id })?;

    let rows = AttributionRepository::new(&state.db)
        .list_for_order(order.id)
        .await?;

    Ok(Json(OrderAttributions::new(order.id, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn row(touchpoint_id: Uuid, model: AttributionModel) -> attribution::Model {
        attribution::Model {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            touchpoint_id,
            model: model.to_string(),
            time_to_purchase: 42,
            created_at: DateTime::parse_from_rfc3339("2025-01-10T12:00:00Z").unwrap(),
        }
    }

    fn tp(at: &str) -> touchpoint::Model {
        touchpoint::Model {
            id: Uuid::new_v4(),
            visitor_id: Uuid::nil(),
            session_id: None,
            event_type: "page_view".to_string(),
            utm_source: Some("google".to_string()),
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
            fbclid: None,
            ttclid: None,
            gclid: None,
            wbraid: None,
            gbraid: None,
            msclkid: None,
            sccid: None,
            referrer: None,
            landing_url: None,
            timestamp: DateTime::parse_from_rfc3339(at).unwrap(),
        }
    }

    #[test]
    fn empty_rows_are_reported_as_direct() {
        let body = OrderAttributions::new(Uuid::nil(), Vec::new());
        assert!(body.direct);
        assert!(body.attributions.is_empty());
    }

    #[test]
    fn attribution_info_keeps_model_tag() {
        let row = row(Uuid::new_v4(), AttributionModel::Assisted);

        let info = AttributionInfo::from(row.clone());
        assert_eq!(info.model, "assisted");
        assert_eq!(info.touchpoint_id, row.touchpoint_id.to_string());
        assert_eq!(info.time_to_purchase, 42);
    }

    #[test]
    fn malformed_order_id_is_a_validation_error() {
        let err = parse_order_id("not-a-uuid").unwrap_err();
        assert_eq!(&*err.code, "VALIDATION_FAILED");
    }

    #[test]
    fn page_size_defaults_and_bounds() {
        assert_eq!(page_size(None).unwrap(), DEFAULT_PAGE_SIZE);
        assert_eq!(page_size(Some(MAX_PAGE_SIZE)).unwrap(), MAX_PAGE_SIZE);
        assert!(page_size(Some(0)).is_err());
        assert!(page_size(Some(MAX_PAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn attribution_path_is_ordered_by_touchpoint_time() {
        let early = tp("2025-01-05T10:00:00Z");
        let late = tp("2025-01-08T10:00:00Z");
        let touchpoints: HashMap<Uuid, touchpoint::Model> =
            [(early.id, early.clone()), (late.id, late.clone())].into();
        let order = order::Model {
            id: Uuid::new_v4(),
            order_id: "1001".to_string(),
            visitor_id: None,
            total_cost: 10.0,
            status: "paid".to_string(),
            created_at: DateTime::parse_from_rfc3339("2025-01-10T10:00:00Z").unwrap(),
        };

        let detail = OrderDetail::new(
            order,
            Vec::new(),
            vec![
                row(late.id, AttributionModel::LastTouch),
                row(early.id, AttributionModel::FirstTouch),
                row(Uuid::new_v4(), AttributionModel::Assisted),
            ],
            &touchpoints,
        );

        assert!(!detail.direct);
        let models: Vec<&str> = detail
            .attributions
            .iter()
            .map(|entry| entry.attribution.model.as_str())
            .collect();
        assert_eq!(models, vec!["first_touch", "last_touch"]);
        assert_eq!(detail.attributions[0].touchpoint.id, early.id.to_string());
    }
}
