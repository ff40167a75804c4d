use models::{Place, PlaceKind, Trip, TripStatus};
use serde_json::Value;
use storage::StorageGateway;

use crate::calendar;
use crate::error::{Result, StoreError};
use crate::ids;
use crate::normalize::{normalize_trip, sanitize_amount};

/// In-memory collection of trips, sole writer to the storage gateway.
///
/// Every mutating operation is atomic with respect to the collection and
/// rewrites the full snapshot before returning. Operations that touch
/// `attractions`, `restaurants`, or a `planning` field also recompute and
/// persist the trip's calendar-activity cache.
pub struct TripStore {
    trips: Vec<Trip>,
    storage: Box<dyn StorageGateway>,
}

/// Partial update for a place; unset fields keep their current value.
#[derive(Debug, Default, Clone)]
pub struct PlacePatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub rating: Option<Option<f64>>,
    pub price_level: Option<String>,
    pub expected_cost: Option<f64>,
    pub duration_min: Option<u32>,
    pub opening_hours: Option<String>,
    pub image: Option<String>,
    pub planning: Option<String>,
    pub time: Option<String>,
    pub end_time: Option<String>,
}

impl TripStore {
    /// Loads the persisted snapshot, normalizing every record.
    pub fn open(storage: Box<dyn StorageGateway>) -> Result<Self> {
        let raw = storage.load_trips()?;
        let trips: Vec<Trip> = raw.into_iter().map(normalize_trip).collect();
        tracing::info!(count = trips.len(), "loaded trip snapshot");
        Ok(Self { trips, storage })
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == trip_id)
    }

    pub fn trips_with_status(&self, status: TripStatus) -> Vec<&Trip> {
        self.trips
            .iter()
            .filter(|t| t.trip_status == status)
            .collect()
    }

    // Trip lifecycle

    /// Inserts a trip record (normalized first). Returns the trip id.
    pub fn add_trip(&mut self, raw: Value) -> Result<String> {
        let trip = normalize_trip(raw);
        let id = trip.id.clone();
        self.trips.push(trip);
        tracing::debug!(trip = %id, "trip added");
        self.persist()?;
        self.refresh_calendar(&id)?;
        Ok(id)
    }

    /// Full replace of an existing trip, re-normalized.
    pub fn update_trip(&mut self, raw: Value) -> Result<()> {
        let trip = normalize_trip(raw);
        let idx = self.index_of(&trip.id)?;
        let id = trip.id.clone();
        self.trips[idx] = trip;
        tracing::debug!(trip = %id, "trip replaced");
        self.persist()?;
        self.refresh_calendar(&id)
    }

    /// Removes a trip and discards its calendar cache.
    pub fn remove_trip(&mut self, trip_id: &str) -> Result<()> {
        let idx = self.index_of(trip_id)?;
        self.trips.remove(idx);
        self.storage.remove_activities(trip_id)?;
        tracing::debug!(trip = trip_id, "trip removed");
        self.persist()
    }

    pub fn set_trip_status(&mut self, trip_id: &str, status: TripStatus) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;
        trip.trip_status = status;
        self.persist()
    }

    // Places

    pub fn add_attraction(&mut self, trip_id: &str, place: Place) -> Result<String> {
        self.add_place(trip_id, PlaceKind::Attraction, place)
    }

    pub fn add_restaurant(&mut self, trip_id: &str, place: Place) -> Result<String> {
        self.add_place(trip_id, PlaceKind::Restaurant, place)
    }

    pub fn edit_attraction(&mut self, trip_id: &str, id: &str, patch: PlacePatch) -> Result<()> {
        self.edit_place(trip_id, PlaceKind::Attraction, id, patch)
    }

    pub fn edit_restaurant(&mut self, trip_id: &str, id: &str, patch: PlacePatch) -> Result<()> {
        self.edit_place(trip_id, PlaceKind::Restaurant, id, patch)
    }

    pub fn remove_attraction(&mut self, trip_id: &str, id: &str) -> Result<()> {
        self.remove_place(trip_id, PlaceKind::Attraction, id)
    }

    pub fn remove_restaurant(&mut self, trip_id: &str, id: &str) -> Result<()> {
        self.remove_place(trip_id, PlaceKind::Restaurant, id)
    }

    pub fn clear_attraction_planning(&mut self, trip_id: &str, id: &str) -> Result<()> {
        self.clear_place_planning(trip_id, PlaceKind::Attraction, id)
    }

    pub fn clear_restaurant_planning(&mut self, trip_id: &str, id: &str) -> Result<()> {
        self.clear_place_planning(trip_id, PlaceKind::Restaurant, id)
    }

    pub fn add_place(&mut self, trip_id: &str, kind: PlaceKind, mut place: Place) -> Result<String> {
        let idx = self.index_of(trip_id)?;
        if place.id.trim().is_empty() {
            place.id = ids::new_place_id(kind);
        }
        let id = place.id.clone();
        places_mut(&mut self.trips[idx], kind).push(place);
        tracing::debug!(trip = trip_id, place = %id, kind = %kind, "place added");
        self.persist()?;
        self.refresh_calendar(trip_id)?;
        Ok(id)
    }

    pub fn edit_place(
        &mut self,
        trip_id: &str,
        kind: PlaceKind,
        id: &str,
        patch: PlacePatch,
    ) -> Result<()> {
        let idx = self.index_of(trip_id)?;
        let place = places_mut(&mut self.trips[idx], kind)
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::PlaceNotFound {
                trip_id: trip_id.to_string(),
                place_id: id.to_string(),
            })?;
        apply_place_patch(place, patch);
        self.persist()?;
        self.refresh_calendar(trip_id)
    }

    /// Removes a place, scrubbing its id from the must-see list and the
    /// calendar cache.
    pub fn remove_place(&mut self, trip_id: &str, kind: PlaceKind, id: &str) -> Result<()> {
        let idx = self.index_of(trip_id)?;
        let trip = &mut self.trips[idx];
        let places = places_mut(trip, kind);
        let before = places.len();
        places.retain(|p| p.id != id);
        if places.len() == before {
            return Err(StoreError::PlaceNotFound {
                trip_id: trip_id.to_string(),
                place_id: id.to_string(),
            });
        }
        trip.must_see_ids.retain(|m| m != id);
        self.drop_cached_activity(trip_id, id)?;
        tracing::debug!(trip = trip_id, place = id, kind = %kind, "place removed");
        self.persist()?;
        self.refresh_calendar(trip_id)
    }

    /// Unschedules a place without deleting it (the calendar delete action
    /// for derived entries).
    pub fn clear_place_planning(&mut self, trip_id: &str, kind: PlaceKind, id: &str) -> Result<()> {
        let idx = self.index_of(trip_id)?;
        let place = places_mut(&mut self.trips[idx], kind)
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::PlaceNotFound {
                trip_id: trip_id.to_string(),
                place_id: id.to_string(),
            })?;
        place.planning = String::new();
        self.drop_cached_activity(trip_id, id)?;
        self.persist()?;
        self.refresh_calendar(trip_id)
    }

    // Must-see list

    /// Flips membership of `item_id` in the must-see set. Returns whether
    /// the item is a must-see after the call. No existence check against
    /// places; dangling ids are tolerated and filtered on read.
    pub fn toggle_must_see(&mut self, trip_id: &str, item_id: &str) -> Result<bool> {
        let trip = self.trip_mut(trip_id)?;
        let present = trip.must_see_ids.iter().position(|id| id == item_id);
        let now_present = match present {
            Some(pos) => {
                trip.must_see_ids.remove(pos);
                false
            }
            None => {
                trip.must_see_ids.push(item_id.to_string());
                true
            }
        };
        self.persist()?;
        Ok(now_present)
    }

    // Internals

    pub(crate) fn index_of(&self, trip_id: &str) -> Result<usize> {
        self.trips
            .iter()
            .position(|t| t.id == trip_id)
            .ok_or_else(|| StoreError::TripNotFound(trip_id.to_string()))
    }

    pub(crate) fn trip_mut(&mut self, trip_id: &str) -> Result<&mut Trip> {
        let idx = self.index_of(trip_id)?;
        Ok(&mut self.trips[idx])
    }

    pub(crate) fn persist(&self) -> Result<()> {
        self.storage.save_trips(&self.trips)?;
        Ok(())
    }

    pub(crate) fn storage(&self) -> &dyn StorageGateway {
        self.storage.as_ref()
    }

    /// Recomputes the projection for one trip and rewrites its cache key.
    pub(crate) fn refresh_calendar(&self, trip_id: &str) -> Result<()> {
        let idx = self.index_of(trip_id)?;
        let trip = &self.trips[idx];
        let cached = self.storage.load_activities(&trip.id)?;
        let projected = calendar::project_activities(trip, &cached);
        self.storage.save_activities(&trip.id, &projected)?;
        Ok(())
    }

    /// Deletes one entry from the cached projection so a removed or
    /// unscheduled place does not survive the next merge.
    fn drop_cached_activity(&self, trip_id: &str, activity_id: &str) -> Result<()> {
        let mut cached = self.storage.load_activities(trip_id)?;
        let before = cached.len();
        cached.retain(|a| a.id != activity_id);
        if cached.len() != before {
            self.storage.save_activities(trip_id, &cached)?;
        }
        Ok(())
    }
}

/// Places flagged as must-see, attractions first. Dangling ids drop out
/// because the result is derived from the live collections.
pub fn must_sees(trip: &Trip) -> Vec<&Place> {
    trip.attractions
        .iter()
        .chain(trip.restaurants.iter())
        .filter(|p| trip.must_see_ids.iter().any(|id| id == &p.id))
        .collect()
}

pub(crate) fn places_mut(trip: &mut Trip, kind: PlaceKind) -> &mut Vec<Place> {
    match kind {
        PlaceKind::Attraction => &mut trip.attractions,
        PlaceKind::Restaurant => &mut trip.restaurants,
    }
}

fn apply_place_patch(place: &mut Place, patch: PlacePatch) {
    if let Some(title) = patch.title {
        place.title = title;
    }
    if let Some(category) = patch.category {
        place.category = category;
    }
    if let Some(address) = patch.address {
        place.address = address;
    }
    if let Some(description) = patch.description {
        place.description = description;
    }
    if let Some(rating) = patch.rating {
        place.rating = rating;
    }
    if let Some(price_level) = patch.price_level {
        place.price_level = price_level;
    }
    if let Some(expected_cost) = patch.expected_cost {
        place.expected_cost = sanitize_amount(expected_cost);
    }
    if let Some(duration_min) = patch.duration_min {
        place.duration_min = duration_min;
    }
    if let Some(opening_hours) = patch.opening_hours {
        place.opening_hours = opening_hours;
    }
    if let Some(image) = patch.image {
        place.image = image;
    }
    if let Some(planning) = patch.planning {
        place.planning = planning;
    }
    if let Some(time) = patch.time {
        place.time = time;
    }
    if let Some(end_time) = patch.end_time {
        place.end_time = end_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use storage::MemoryStorage;

    fn seeded_store() -> (TripStore, Arc<MemoryStorage>) {
        let mem = Arc::new(MemoryStorage::new());
        mem.seed(
            "trips",
            &json!([{
                "id": "t1",
                "title": "Barcelona Weekend Getaway",
                "tripStatus": "ongoing",
                "destination": {"city": "Barcelona", "country": "Spain"},
                "dates": {"start": "2025-11-21", "end": "2025-11-24", "nights": 3},
                "attractions": [
                    {"id": "a_sagrada", "title": "Sagrada Família", "planning": "2025-11-22", "time": "09:30"},
                    {"id": "a_beach", "title": "Barceloneta Beach"},
                ],
                "restaurants": [
                    {"id": "r_gaudi", "title": "Arrosseria Gaudí", "planning": "2025-11-22", "time": "20:00"},
                ],
                "mustSeeIds": ["a_sagrada", "r_gaudi"],
                "budget": {"total": 10900, "expenses": []},
            }])
            .to_string(),
        );
        let store = TripStore::open(Box::new(mem.clone())).unwrap();
        (store, mem)
    }

    #[test]
    fn test_open_normalizes_legacy_records() {
        let mem = Arc::new(MemoryStorage::new());
        mem.seed(
            "trips",
            r#"[{"id": "t1", "status": "planned", "budget": {"total": 5000, "breakdown": {"flights": 1000}}}]"#,
        );
        let store = TripStore::open(Box::new(mem)).unwrap();

        let trip = store.trip("t1").unwrap();
        assert_eq!(trip.budget.expenses.len(), 1);
        assert_eq!(trip.budget.expenses[0].title, "Flights");
    }

    #[test]
    fn test_add_and_remove_trip() {
        let (mut store, mem) = seeded_store();

        let id = store
            .add_trip(json!({"title": "Lisbon", "attractions": [
                {"id": "a1", "title": "Belém Tower", "planning": "2026-03-02"},
            ]}))
            .unwrap();
        assert_eq!(store.trips().len(), 2);
        // The new trip's calendar cache is written right away
        assert_eq!(mem.load_activities(&id).unwrap().len(), 1);

        store.remove_trip(&id).unwrap();
        assert_eq!(store.trips().len(), 1);
        assert!(!mem.has_key(&format!("activities_{}", id)));

        assert!(matches!(
            store.remove_trip("nope"),
            Err(StoreError::TripNotFound(_))
        ));
    }

    #[test]
    fn test_update_trip_is_renormalized() {
        let (mut store, _mem) = seeded_store();

        store
            .update_trip(json!({
                "id": "t1",
                "title": "Barcelona, again",
                "budget": {"total": "9000", "breakdown": {"food": 300}},
            }))
            .unwrap();

        let trip = store.trip("t1").unwrap();
        assert_eq!(trip.title, "Barcelona, again");
        assert_eq!(trip.budget.total, 9000.0);
        assert_eq!(trip.budget.expenses[0].title, "Food & Drinks");
    }

    #[test]
    fn test_toggle_must_see_is_an_involution() {
        let (mut store, _mem) = seeded_store();
        let before = store.trip("t1").unwrap().must_see_ids.clone();

        assert!(store.toggle_must_see("t1", "a_beach").unwrap());
        assert!(!store.toggle_must_see("t1", "a_beach").unwrap());

        assert_eq!(store.trip("t1").unwrap().must_see_ids, before);
    }

    #[test]
    fn test_remove_attraction_scrubs_must_sees_and_calendar() {
        let (mut store, mem) = seeded_store();

        store.remove_attraction("t1", "a_sagrada").unwrap();

        let trip = store.trip("t1").unwrap();
        assert_eq!(trip.attractions.len(), 1);
        assert!(!trip.must_see_ids.contains(&"a_sagrada".to_string()));

        let activities = mem.load_activities("t1").unwrap();
        assert!(activities.iter().all(|a| a.id != "a_sagrada"));
        assert!(activities.iter().any(|a| a.id == "r_gaudi"));
    }

    #[test]
    fn test_clear_planning_removes_derived_activity() {
        let (mut store, mem) = seeded_store();

        store.clear_restaurant_planning("t1", "r_gaudi").unwrap();

        let trip = store.trip("t1").unwrap();
        let gaudi = trip.restaurants.iter().find(|p| p.id == "r_gaudi").unwrap();
        assert!(gaudi.planning.is_empty());

        let activities = mem.load_activities("t1").unwrap();
        assert!(activities.iter().all(|a| a.id != "r_gaudi"));
    }

    #[test]
    fn test_edit_place_patches_fields() {
        let (mut store, mem) = seeded_store();

        store
            .edit_attraction(
                "t1",
                "a_beach",
                PlacePatch {
                    planning: Some("2025-11-23".to_string()),
                    time: Some("14:00".to_string()),
                    expected_cost: Some(-3.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let trip = store.trip("t1").unwrap();
        let beach = trip.attractions.iter().find(|p| p.id == "a_beach").unwrap();
        assert_eq!(beach.planning, "2025-11-23");
        assert_eq!(beach.expected_cost, 0.0);
        assert_eq!(beach.title, "Barceloneta Beach");

        let activities = mem.load_activities("t1").unwrap();
        assert!(activities.iter().any(|a| a.id == "a_beach"));

        assert!(matches!(
            store.edit_attraction("t1", "missing", PlacePatch::default()),
            Err(StoreError::PlaceNotFound { .. })
        ));
    }

    #[test]
    fn test_add_place_generates_prefixed_id() {
        let (mut store, _mem) = seeded_store();
        let place: Place = serde_json::from_value(json!({"id": "", "title": "Park Güell"})).unwrap();

        let id = store.add_restaurant("t1", place).unwrap();
        assert!(id.starts_with("r_"));
    }

    #[test]
    fn test_must_sees_filters_dangling_ids() {
        let (mut store, _mem) = seeded_store();
        store.toggle_must_see("t1", "gone_forever").unwrap();

        let trip = store.trip("t1").unwrap();
        let names: Vec<&str> = must_sees(trip).iter().map(|p| p.title.as_str()).collect();
        assert_eq!(names, vec!["Sagrada Família", "Arrosseria Gaudí"]);
    }

    #[test]
    fn test_trips_with_status() {
        let (mut store, _mem) = seeded_store();
        store
            .add_trip(json!({"id": "t2", "title": "Oslo", "tripStatus": "planned"}))
            .unwrap();

        assert_eq!(store.trips_with_status(TripStatus::Ongoing).len(), 1);
        assert_eq!(store.trips_with_status(TripStatus::Planned).len(), 1);
        assert!(store.trips_with_status(TripStatus::Completed).is_empty());

        store.set_trip_status("t2", TripStatus::Completed).unwrap();
        assert_eq!(store.trips_with_status(TripStatus::Completed).len(), 1);
    }
}
