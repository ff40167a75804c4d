use std::collections::HashMap;
use std::sync::Mutex;

use models::{CalendarActivity, Trip};
use serde_json::Value;

use crate::{activities_key, decode_activities, Result, StorageGateway, TRIPS_KEY};

/// In-memory storage keeping serialized documents under the same logical
/// keys as `FileStorage`. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw document under a key, bypassing the typed API. Lets tests
    /// start from legacy snapshot shapes.
    pub fn seed(&self, key: &str, raw: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), raw.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

impl StorageGateway for MemoryStorage {
    fn load_trips(&self) -> Result<Vec<Value>> {
        let entries = self.entries.lock().unwrap();
        let Some(raw) = entries.get(TRIPS_KEY) else {
            return Ok(vec![]);
        };
        let value: Value = serde_json::from_str(raw)?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    fn save_trips(&self, trips: &[Trip]) -> Result<()> {
        let raw = serde_json::to_string(trips)?;
        self.entries
            .lock()
            .unwrap()
            .insert(TRIPS_KEY.to_string(), raw);
        Ok(())
    }

    fn load_activities(&self, trip_id: &str) -> Result<Vec<CalendarActivity>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&activities_key(trip_id)) {
            Some(raw) => decode_activities(raw),
            None => Ok(vec![]),
        }
    }

    fn save_activities(&self, trip_id: &str, activities: &[CalendarActivity]) -> Result<()> {
        let raw = serde_json::to_string(activities)?;
        self.entries
            .lock()
            .unwrap()
            .insert(activities_key(trip_id), raw);
        Ok(())
    }

    fn remove_activities(&self, trip_id: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(&activities_key(trip_id));
        Ok(())
    }
}
