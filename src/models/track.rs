use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackSelection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub value: TrackValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "track_value")]
pub enum TrackValue {
    #[sqlx(rename = "TVL")]
    #[serde(rename = "TVL")]
    Tvl,
    Academic,
}

#[derive(Debug, Deserialize)]
pub struct StoreTrackRequest {
    pub value: TrackValue,
}
