//! # Revenue Report Handlers
//!
//! Grouped revenue reports over a date range.

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::attribution::{GroupBy, RevenueQuery, RevenueRow};
use crate::error::{ApiError, validation_error};
use crate::models::AttributionModel;
use crate::server::AppState;

/// Length of the report range when `start_date` is omitted
const DEFAULT_REPORT_DAYS: i64 = 30;

/// Query parameters for the revenue report
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RevenueReportParams {
    /// Inclusive start, `YYYY-MM-DD` or RFC3339 (defaults to 30 days before the end)
    pub start_date: Option<String>,
    /// Inclusive end, `YYYY-MM-DD` (whole day) or RFC3339 (defaults to now)
    pub end_date: Option<String>,
    /// Attribution model (defaults to the configured model)
    pub model: Option<String>,
    /// Grouping dimension (defaults to `source`)
    pub group_by: Option<String>,
    /// Optional order status filter
    pub status: Option<String>,
}

/// Revenue report response
///
/// Each row carries the grouping key under the name of the `group_by` dimension.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevenueReport {
    #[schema(example = "source")]
    pub group_by: GroupBy,
    #[schema(example = "last_touch")]
    pub model: AttributionModel,
    #[schema(value_type = Vec<Object>, example = json!([{"source": "google", "revenue": 100.0, "orders": 1, "aov": 100.0}]))]
    pub rows: Vec<Map<String, Value>>,
}

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn present_row(group_by: GroupBy, row: RevenueRow) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(group_by.as_str().to_string(), Value::String(row.key));
    out.insert("revenue".to_string(), json!(round_currency(row.revenue)));
    out.insert("orders".to_string(), json!(row.orders));
    out.insert("aov".to_string(), json!(round_currency(row.aov)));
    out
}

/// Parse a report bound. Plain dates cover the whole day when used as the end bound.
pub fn parse_bound(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let naive = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(naive.and_utc())
}

/// Parse an optional bound; blank counts as absent.
pub(crate) fn optional_bound(
    field: &'static str,
    value: Option<&str>,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    parse_bound(raw, end_of_day).map(Some).ok_or_else(|| {
        validation_error(
            &format!("Invalid {field} format"),
            json!({ field: "Must be YYYY-MM-DD or an RFC3339 timestamp" }),
        )
    })
}

pub(crate) fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if start > end {
        return Err(validation_error(
            "Invalid date range",
            json!({ "end_date": "Must not be before start_date" }),
        ));
    }
    Ok(())
}

pub(crate) fn status_filter(status: Option<String>) -> Option<String> {
    status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Revenue grouped by the credited touchpoint's marketing dimension
#[utoipa::path(
    get,
    path = "/reports/revenue",
    params(RevenueReportParams),
    responses(
        (status = 200, description = "Revenue grouped by dimension, highest revenue first", body = RevenueReport),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "reports"
)]
pub async fn revenue_report(
    State(state): State<AppState>,
    Query(params): Query<RevenueReportParams>,
) -> Result<Json<RevenueReport>, ApiError> {
    let end =
        optional_bound("end_date", params.end_date.as_deref(), true)?.unwrap_or_else(Utc::now);
    let start = optional_bound("start_date", params.start_date.as_deref(), false)?
        .unwrap_or(end - Duration::days(DEFAULT_REPORT_DAYS));
    ensure_ordered(start, end)?;

    let model = match params.model.as_deref() {
        Some(raw) => raw.parse::<AttributionModel>().map_err(|_| {
            validation_error(
                "Invalid model",
                json!({ "model": "Must be one of: first_touch, last_touch, assisted" }),
            )
        })?,
        None => state.config.attribution.default_model,
    };

    let group_by = match params.group_by.as_deref() {
        Some(raw) => raw.parse::<GroupBy>().map_err(|_| {
            validation_error(
                "Invalid group_by",
                json!({
                    "group_by": "Must be one of: source, medium, campaign, creative, source_medium"
                }),
            )
        })?,
        None => GroupBy::default(),
    };

    let query = RevenueQuery {
        start,
        end,
        model,
        group_by,
        status: status_filter(params.status),
    };

    let rows = state.aggregator.revenue_by_dimension(&query).await?;

    Ok(Json(RevenueReport {
        group_by,
        model,
        rows: rows
            .into_iter()
            .map(|row| present_row(group_by, row))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_cover_the_whole_day() {
        let start = parse_bound("2025-01-10", false).unwrap();
        let end = parse_bound("2025-01-10", true).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-10T00:00:00+00:00");
        assert!(end > start);
        assert_eq!(end.date_naive(), start.date_naive());
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn rfc3339_bounds_are_taken_verbatim() {
        let ts = parse_bound("2025-01-10T12:00:00+02:00", true).unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-01-10T10:00:00+00:00");
    }

    #[test]
    fn absent_or_blank_bounds_are_none() {
        assert!(optional_bound("start_date", None, false).unwrap().is_none());
        assert!(optional_bound("start_date", Some("  "), false).unwrap().is_none());
        let err = optional_bound("end_date", Some("yesterday"), true).unwrap_err();
        assert_eq!(&*err.code, "VALIDATION_FAILED");
    }

    #[test]
    fn garbage_bounds_are_rejected() {
        assert!(parse_bound("10/01/2025", false).is_none());
        assert!(parse_bound("", false).is_none());
    }

    #[test]
    fn rows_use_dimension_name_as_key_and_round_for_display() {
        let row = RevenueRow {
            key: "google/cpc".to_string(),
            revenue: 100.0 / 3.0,
            orders: 3,
            aov: 100.0 / 9.0,
        };

        let out = present_row(GroupBy::SourceMedium, row);

        assert_eq!(out["source_medium"], json!("google/cpc"));
        assert_eq!(out["revenue"], json!(33.33));
        assert_eq!(out["orders"], json!(3));
        assert_eq!(out["aov"], json!(11.11));
        assert!(!out.contains_key("key"));
    }
}
