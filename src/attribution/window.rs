//! Shared helpers for the attribution window and grouping dimensions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::touchpoint;

/// Grouping key used for orders without an attributable touchpoint.
pub const DIRECT_KEY: &str = "direct";

/// Normalize any timestamp to a UTC `+00:00` offset before it reaches the database.
pub fn to_db_time<Tz: TimeZone>(dt: DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&Utc).fixed_offset()
}

/// Start of the attribution window ending at `created_at`.
pub fn window_start(created_at: DateTime<FixedOffset>, window_days: u32) -> DateTime<FixedOffset> {
    created_at - Duration::days(i64::from(window_days))
}

/// Whole seconds from the touchpoint to the order, never negative.
pub fn time_to_purchase(
    order_created_at: DateTime<FixedOffset>,
    touchpoint_at: DateTime<FixedOffset>,
) -> i64 {
    (order_created_at - touchpoint_at).num_seconds().max(0)
}

// Blank means empty after stripping spaces, as SQL `TRIM` does in the window scan.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(|v| v.trim_matches(' ')).filter(|v| !v.is_empty())
}

/// A touchpoint is direct when it carries no UTM source or medium, no click
/// id and no referrer. Direct touchpoints are never attributed.
pub fn is_direct(tp: &touchpoint::Model) -> bool {
    let click_ids = [
        &tp.fbclid,
        &tp.ttclid,
        &tp.gclid,
        &tp.wbraid,
        &tp.gbraid,
        &tp.msclkid,
        &tp.sccid,
    ];

    present(tp.utm_source.as_deref()).is_none()
        && present(tp.utm_medium.as_deref()).is_none()
        && present(tp.referrer.as_deref()).is_none()
        && click_ids.iter().all(|id| present(id.as_deref()).is_none())
}

/// Dimension a revenue report is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Source,
    Medium,
    Campaign,
    /// Grouped by `utm_content`
    Creative,
    SourceMedium,
}

impl GroupBy {
    pub const ALL: [GroupBy; 5] = [
        GroupBy::Source,
        GroupBy::Medium,
        GroupBy::Campaign,
        GroupBy::Creative,
        GroupBy::SourceMedium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Source => "source",
            GroupBy::Medium => "medium",
            GroupBy::Campaign => "campaign",
            GroupBy::Creative => "creative",
            GroupBy::SourceMedium => "source_medium",
        }
    }

    /// Grouping key for an order credited to `tp`, or `"direct"` when there is none.
    pub fn key_for(&self, tp: Option<&touchpoint::Model>) -> String {
        let Some(tp) = tp else {
            return DIRECT_KEY.to_string();
        };

        let or_direct = |value: &Option<String>| {
            present(value.as_deref()).unwrap_or(DIRECT_KEY).to_string()
        };

        match self {
            GroupBy::Source => or_direct(&tp.utm_source),
            GroupBy::Medium => or_direct(&tp.utm_medium),
            GroupBy::Campaign => or_direct(&tp.utm_campaign),
            GroupBy::Creative => or_direct(&tp.utm_content),
            GroupBy::SourceMedium => {
                format!("{}/{}", or_direct(&tp.utm_source), or_direct(&tp.utm_medium))
            }
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group_by '{0}'; expected source, medium, campaign, creative or source_medium")]
pub struct UnknownGroupBy(pub String);

impl FromStr for GroupBy {
    type Err = UnknownGroupBy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        GroupBy::ALL
            .into_iter()
            .find(|group_by| group_by.as_str() == value)
            .ok_or_else(|| UnknownGroupBy(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn touchpoint() -> touchpoint::Model {
        touchpoint::Model {
            id: Uuid::new_v4(),
            visitor_id: Uuid::new_v4(),
            session_id: None,
            event_type: "page_view".to_string(),
            utm_source: None,
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
            landing_url: Some("https://shop.example.com/".to_string()),
            timestamp: ts("2025-01-10T12:00:00Z"),
        }
    }

    #[test]
    fn bare_page_view_is_direct() {
        assert!(is_direct(&touchpoint()));
    }

    #[test]
    fn blank_metadata_still_counts_as_direct() {
        let tp = touchpoint::Model {
            utm_source: Some("".to_string()),
            referrer: Some("   ".to_string()),
            ..touchpoint()
        };
        assert!(is_direct(&tp));
    }

    #[test]
    fn any_attribution_signal_makes_touchpoint_attributable() {
        let with_source = touchpoint::Model {
            utm_source: Some("google".to_string()),
            ..touchpoint()
        };
        let with_medium = touchpoint::Model {
            utm_medium: Some("cpc".to_string()),
            ..touchpoint()
        };
        let with_click_id = touchpoint::Model {
            msclkid: Some("abc".to_string()),
            ..touchpoint()
        };
        let with_referrer = touchpoint::Model {
            referrer: Some("https://news.example.org/".to_string()),
            ..touchpoint()
        };

        for tp in [with_source, with_medium, with_click_id, with_referrer] {
            assert!(!is_direct(&tp));
        }
    }

    #[test]
    fn campaign_alone_does_not_make_touchpoint_attributable() {
        let tp = touchpoint::Model {
            utm_campaign: Some("spring".to_string()),
            ..touchpoint()
        };
        assert!(is_direct(&tp));
    }

    #[test]
    fn window_start_subtracts_whole_days() {
        let created = ts("2025-02-01T08:30:00Z");
        assert_eq!(window_start(created, 30), ts("2025-01-02T08:30:00Z"));
    }

    #[test]
    fn time_to_purchase_floors_and_clamps() {
        let order = ts("2025-01-10T12:00:00Z");
        let earlier = DateTime::parse_from_rfc3339("2025-01-10T11:58:59.750Z").unwrap();
        assert_eq!(time_to_purchase(order, earlier), 60);
        assert_eq!(time_to_purchase(order, ts("2025-01-10T12:00:05Z")), 0);
    }

    #[test]
    fn to_db_time_normalizes_offset() {
        let local = ts("2025-01-10T14:00:00+02:00");
        let normalized = to_db_time(local);
        assert_eq!(normalized.offset().local_minus_utc(), 0);
        assert_eq!(normalized, local);
    }

    #[test]
    fn grouping_keys_fall_back_to_direct() {
        let tp = touchpoint::Model {
            utm_source: Some("facebook".to_string()),
            utm_content: Some("carousel-a".to_string()),
            ..touchpoint()
        };

        assert_eq!(GroupBy::Source.key_for(Some(&tp)), "facebook");
        assert_eq!(GroupBy::Medium.key_for(Some(&tp)), "direct");
        assert_eq!(GroupBy::Campaign.key_for(Some(&tp)), "direct");
        assert_eq!(GroupBy::Creative.key_for(Some(&tp)), "carousel-a");
        assert_eq!(GroupBy::SourceMedium.key_for(Some(&tp)), "facebook/direct");
        assert_eq!(GroupBy::SourceMedium.key_for(None), "direct");
    }

    #[test]
    fn group_by_parses_known_names_only() {
        for group_by in GroupBy::ALL {
            assert_eq!(group_by.as_str().parse::<GroupBy>(), Ok(group_by));
        }
        assert!("channel".parse::<GroupBy>().is_err());
        assert_eq!(GroupBy::default(), GroupBy::Source);
    }
}
