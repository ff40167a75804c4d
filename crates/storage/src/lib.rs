pub mod file;
pub mod memory;

pub use crate::file::FileStorage;
pub use crate::memory::MemoryStorage;

use models::{CalendarActivity, Trip};
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Port to the durable snapshot tables. Two logical keys are stored:
/// `trips` (the full trip list, rewritten wholesale on every mutation) and
/// `activities_<tripId>` (the cached calendar projection, one key per trip).
///
/// Trips load as raw JSON values; the store normalizes them at the boundary,
/// so older snapshot shapes stay readable.
pub trait StorageGateway {
    fn load_trips(&self) -> Result<Vec<Value>>;
    fn save_trips(&self, trips: &[Trip]) -> Result<()>;
    fn load_activities(&self, trip_id: &str) -> Result<Vec<CalendarActivity>>;
    fn save_activities(&self, trip_id: &str, activities: &[CalendarActivity]) -> Result<()>;
    fn remove_activities(&self, trip_id: &str) -> Result<()>;
}

impl<T: StorageGateway + ?Sized> StorageGateway for std::sync::Arc<T> {
    fn load_trips(&self) -> Result<Vec<Value>> {
        (**self).load_trips()
    }
    fn save_trips(&self, trips: &[Trip]) -> Result<()> {
        (**self).save_trips(trips)
    }
    fn load_activities(&self, trip_id: &str) -> Result<Vec<CalendarActivity>> {
        (**self).load_activities(trip_id)
    }
    fn save_activities(&self, trip_id: &str, activities: &[CalendarActivity]) -> Result<()> {
        (**self).save_activities(trip_id, activities)
    }
    fn remove_activities(&self, trip_id: &str) -> Result<()> {
        (**self).remove_activities(trip_id)
    }
}

pub(crate) const TRIPS_KEY: &str = "trips";

pub(crate) fn activities_key(trip_id: &str) -> String {
    format!("activities_{}", trip_id)
}

/// Decodes a stored activity document, dropping entries that no longer
/// deserialize instead of failing the whole list.
pub(crate) fn decode_activities(raw: &str) -> Result<Vec<CalendarActivity>> {
    let value: Value = serde_json::from_str(raw)?;
    let entries = match value.as_array() {
        Some(arr) => arr.clone(),
        None => return Ok(vec![]),
    };
    Ok(entries
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}
