use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Acme Garments Ltd",
        "address": "Plot 12, Export Processing Zone",
        "contact_email": "hr@acme.example",
        "status": "active"
    })
)]
pub struct Organization {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Acme Garments Ltd")]
    pub name: String,

    #[schema(example = "Plot 12, Export Processing Zone", nullable = true)]
    pub address: Option<String>,

    #[schema(example = "hr@acme.example", nullable = true)]
    pub contact_email: Option<String>,

    #[schema(example = "active")]
    pub status: String,

    #[schema(example = "2026-01-01T00:00:00Z", value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
