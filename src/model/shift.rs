use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Morning",
        "category": "production",
        "start_time": "09:00",
        "end_time": "17:00",
        "grace_before_min": 15,
        "grace_after_min": 30,
        "presence_time_sec": 3,
        "presence_count": 3,
        "presence_window_sec": 10
    })
)]
pub struct Shift {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Morning")]
    pub name: String,

    /// Employee category this shift applies to.
    #[schema(example = "production")]
    pub category: String,

    /// Time-of-day only, no date. "HH:MM", "HH:MM:SS" and 12h "hh:mm AM/PM"
    /// are all accepted by the parser.
    #[schema(example = "09:00")]
    pub start_time: String,

    /// end_time earlier than start_time denotes a shift crossing midnight.
    #[schema(example = "17:00")]
    pub end_time: String,

    #[schema(example = 15, nullable = true)]
    pub grace_before_min: Option<i64>,

    #[schema(example = 30, nullable = true)]
    pub grace_after_min: Option<i64>,

    /// Minimum span (seconds) between oldest and newest detection accepted
    /// as proof of continuous presence.
    #[schema(example = 3, nullable = true)]
    pub presence_time_sec: Option<i64>,

    /// Minimum number of detections in the rolling window.
    #[schema(example = 3, nullable = true)]
    pub presence_count: Option<i64>,

    /// Rolling window (seconds) the detection samples are counted in.
    #[schema(example = 10, nullable = true)]
    pub presence_window_sec: Option<i64>,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
