use std::fs;
use std::path::{Path, PathBuf};

use models::{CalendarActivity, Trip};
use serde_json::Value;

use crate::{activities_key, decode_activities, Result, StorageGateway, TRIPS_KEY};

/// File-backed storage: each logical key maps to `<dir>/<key>.json`,
/// pretty-printed. The directory is created on first write.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn write_key(&self, key: &str, value: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let formatted = serde_json::to_string_pretty(value)?;
        fs::write(self.key_path(key), formatted)?;
        Ok(())
    }

    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

impl StorageGateway for FileStorage {
    fn load_trips(&self) -> Result<Vec<Value>> {
        let Some(raw) = self.read_key(TRIPS_KEY)? else {
            return Ok(vec![]);
        };
        let value: Value = serde_json::from_str(&raw)?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    fn save_trips(&self, trips: &[Trip]) -> Result<()> {
        let value = serde_json::to_value(trips)?;
        self.write_key(TRIPS_KEY, &value)?;
        tracing::debug!(count = trips.len(), "wrote trip snapshot");
        Ok(())
    }

    fn load_activities(&self, trip_id: &str) -> Result<Vec<CalendarActivity>> {
        match self.read_key(&activities_key(trip_id))? {
            Some(raw) => decode_activities(&raw),
            None => Ok(vec![]),
        }
    }

    fn save_activities(&self, trip_id: &str, activities: &[CalendarActivity]) -> Result<()> {
        let value = serde_json::to_value(activities)?;
        self.write_key(&activities_key(trip_id), &value)
    }

    fn remove_activities(&self, trip_id: &str) -> Result<()> {
        let path = self.key_path(&activities_key(trip_id));
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_storage(tag: &str) -> FileStorage {
        let dir = std::env::temp_dir().join(format!(
            "triptailor_storage_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        FileStorage::new(dir)
    }

    #[test]
    fn test_missing_snapshot_loads_empty() {
        let storage = temp_storage("missing");
        assert!(storage.load_trips().unwrap().is_empty());
        assert!(storage.load_activities("t1").unwrap().is_empty());
    }

    #[test]
    fn test_trip_snapshot_round_trip() {
        let storage = temp_storage("round_trip");
        let trip: Trip = serde_json::from_value(json!({
            "id": "t1",
            "title": "Lisbon",
            "tripStatus": "ongoing",
        }))
        .unwrap();

        storage.save_trips(&[trip]).unwrap();

        let loaded = storage.load_trips().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].get("id").unwrap().as_str().unwrap(), "t1");
        assert_eq!(
            loaded[0].get("tripStatus").unwrap().as_str().unwrap(),
            "ongoing"
        );
    }

    #[test]
    fn test_activities_key_is_per_trip() {
        let storage = temp_storage("per_trip");
        let act: CalendarActivity = serde_json::from_value(json!({
            "id": "a1",
            "name": "Sagrada Família",
            "type": "Attraction",
            "day": "2025-11-22",
        }))
        .unwrap();

        storage.save_activities("t1", &[act]).unwrap();

        assert_eq!(storage.load_activities("t1").unwrap().len(), 1);
        assert!(storage.load_activities("t2").unwrap().is_empty());

        storage.remove_activities("t1").unwrap();
        assert!(storage.load_activities("t1").unwrap().is_empty());
        // Removing an absent key is fine
        storage.remove_activities("t1").unwrap();
    }

    #[test]
    fn test_malformed_activity_entries_are_dropped() {
        let storage = temp_storage("malformed");
        fs::create_dir_all(&storage.dir).unwrap();
        fs::write(
            storage.key_path(&activities_key("t1")),
            r#"[{"id": "a1", "name": "Walk", "type": "Attraction"}, {"nope": true}, 42]"#,
        )
        .unwrap();

        let loaded = storage.load_activities("t1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "a1");
    }
}
