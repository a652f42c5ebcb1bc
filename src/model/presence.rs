use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only liveness sample reported by a recognition device. Used only
/// to debounce check-ins; pruned after the retention window.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PresenceDetection {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "2026-01-05T08:54:58", value_type = String, format = "date-time")]
    pub detected_at: NaiveDateTime,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub det_date: NaiveDate,
}
