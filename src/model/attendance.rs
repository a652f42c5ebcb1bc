use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_id": 1000,
        "att_date": "2026-01-05",
        "check_in": "2026-01-05T08:55:00",
        "check_out": "2026-01-05T17:45:00",
        "delay_minutes": 0,
        "extra_minutes": 45,
        "total_hours": 8.83,
        "ot_hours": 0.75,
        "ot_manual": false,
        "check_in_location": "HQ gate 2",
        "check_out_location": "HQ gate 2",
        "is_edited": false
    })
)]
pub struct Attendance {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1000)]
    pub employee_id: u64,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub att_date: NaiveDate,

    /// Null check-in together with null check-out marks an absence row.
    #[schema(example = "2026-01-05T08:55:00", value_type = String, format = "date-time", nullable = true)]
    pub check_in: Option<NaiveDateTime>,

    /// Null check-out with a check-in present means the shift is still open.
    #[schema(example = "2026-01-05T17:45:00", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,

    #[schema(example = 0)]
    pub delay_minutes: i64,

    #[schema(example = 45)]
    pub extra_minutes: i64,

    #[schema(example = 8.83)]
    pub total_hours: f64,

    #[schema(example = 0.75)]
    pub ot_hours: f64,

    /// Set when an administrator overrode ot_hours; a manual value survives
    /// every later recomputation.
    #[schema(example = false)]
    pub ot_manual: bool,

    #[schema(example = "HQ gate 2", nullable = true)]
    pub check_in_location: Option<String>,

    #[schema(example = "HQ gate 2", nullable = true)]
    pub check_out_location: Option<String>,

    #[schema(example = false)]
    pub is_edited: bool,

    #[schema(example = "late arrival approved", nullable = true)]
    pub remark: Option<String>,

    #[schema(example = "2026-01-06T10:00:00", value_type = String, format = "date-time", nullable = true)]
    pub edited_at: Option<NaiveDateTime>,
}

impl Attendance {
    /// Absence marker rows carry neither punch.
    pub fn is_absence_marker(&self) -> bool {
        self.check_in.is_none() && self.check_out.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }
}
