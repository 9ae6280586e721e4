use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// A catalog entry as inserted into the `Applications` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub meta_id: String,
    pub display_name: String,
    pub image_uri: String,
}

/// An `Applications` row read back from the store, with its assigned id.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationRow {
    pub id: i64,
    pub meta_id: String,
    pub display_name: String,
    pub image_uri: String,
}

/// Projection of `ApplicationDetails` used for the incremental diff.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailRef {
    pub app: i64,
}

/// A localized detail record as inserted into `ApplicationDetails`.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    pub app: i64,
    pub locale: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub genres: Vec<String>,
    pub headset_names: Vec<String>,
    pub publisher: Option<String>,
    pub website_url: Option<String>,
    pub oculus_url: Option<String>,
    pub price: f64,
    pub currency: String,
    pub rating: f64,
}

/// A `MetaHeadsetsApps` row: cached per-headset application count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadsetCountRow {
    pub id: i64,
    pub headset: String,
    pub count: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfos {
    pub application_meta_ids: Vec<String>,
    pub applications: u64,
    pub application_details: u64,
    pub application_images: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewOutcome {
    /// `(headset name, entries collected)` in registry order.
    pub retrieved: Vec<(String, usize)>,
    pub attempted: usize,
    pub created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailOutcome {
    /// Applications that had no detail record at the start of the phase.
    pub candidates: usize,
    /// Detail records actually persisted.
    pub created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageOutcome {
    pub missing: usize,
    pub uploaded: usize,
}
