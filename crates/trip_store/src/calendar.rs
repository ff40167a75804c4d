use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use models::{CalendarActivity, Place, PlaceKind, Trip, TripDates};

use crate::error::{Result, StoreError};
use crate::ids;
use crate::store::TripStore;

/// Derives the calendar activities for a trip: every place with a non-blank
/// planning date projects to one entry, then cached entries whose id is not
/// in the derived set are appended. The second source keeps manually added
/// calendar entries (not backed by a place) alive across recomputation.
pub fn project_activities(trip: &Trip, cached: &[CalendarActivity]) -> Vec<CalendarActivity> {
    let mut out: Vec<CalendarActivity> = Vec::new();

    let sources = [
        (&trip.attractions, PlaceKind::Attraction),
        (&trip.restaurants, PlaceKind::Restaurant),
    ];
    for (places, kind) in sources {
        for place in places.iter().filter(|p| !p.planning.trim().is_empty()) {
            out.push(derive_activity(place, kind));
        }
    }

    let derived_ids: HashSet<String> = out.iter().map(|a| a.id.clone()).collect();
    for entry in cached.iter().filter(|c| !derived_ids.contains(c.id.as_str())) {
        out.push(entry.clone());
    }

    out
}

fn derive_activity(place: &Place, kind: PlaceKind) -> CalendarActivity {
    CalendarActivity {
        id: place.id.clone(),
        name: place.title.clone(),
        kind,
        image: place.image.clone(),
        day: place.planning.trim().to_string(),
        time: place.time.clone(),
        end_time: place.end_time.clone(),
    }
}

/// Activities scheduled on one date, sorted by start time ascending.
///
/// Sorting is stable; entries without a time go last, preserving their
/// relative order. HH:MM strings compare correctly as text.
pub fn day_activities<'a>(
    activities: &'a [CalendarActivity],
    date: &str,
) -> Vec<&'a CalendarActivity> {
    let mut subset: Vec<&CalendarActivity> =
        activities.iter().filter(|a| a.day == date).collect();

    subset.sort_by(|a, b| match (a.time.is_empty(), b.time.is_empty()) {
        (false, false) => a.time.cmp(&b.time),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    });

    subset
}

/// Inclusive day range of a trip. Empty when either bound is missing or
/// unparsable, or when the range is inverted.
pub fn trip_days(dates: &TripDates) -> Vec<NaiveDate> {
    let start = NaiveDate::parse_from_str(dates.start.trim(), "%Y-%m-%d");
    let end = NaiveDate::parse_from_str(dates.end.trim(), "%Y-%m-%d");
    let (Ok(start), Ok(end)) = (start, end) else {
        return vec![];
    };

    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

impl TripStore {
    /// Current calendar projection for a trip (derived places merged with
    /// the cached entries), without rewriting the cache.
    pub fn activities(&self, trip_id: &str) -> Result<Vec<CalendarActivity>> {
        let trip = self
            .trip(trip_id)
            .ok_or_else(|| StoreError::TripNotFound(trip_id.to_string()))?;
        let cached = self.storage().load_activities(trip_id)?;
        Ok(project_activities(trip, &cached))
    }

    /// Schedules an ad-hoc calendar entry not backed by a place. It lives in
    /// the cache only and survives reprojection.
    pub fn add_custom_activity(
        &mut self,
        trip_id: &str,
        mut activity: CalendarActivity,
    ) -> Result<String> {
        self.index_of(trip_id)?;
        if activity.id.trim().is_empty() {
            activity.id = ids::new_activity_id();
        }
        let id = activity.id.clone();
        let mut cached = self.storage().load_activities(trip_id)?;
        cached.push(activity);
        self.storage().save_activities(trip_id, &cached)?;
        tracing::debug!(trip = trip_id, activity = %id, "custom activity added");
        Ok(id)
    }

    /// Deletes a calendar entry. For a derived entry this unschedules the
    /// source place (the place itself stays); a cache-only entry is dropped
    /// from the cache.
    pub fn remove_activity(&mut self, trip_id: &str, activity_id: &str) -> Result<()> {
        let trip = self
            .trip(trip_id)
            .ok_or_else(|| StoreError::TripNotFound(trip_id.to_string()))?;

        let derived_kind = if scheduled(&trip.attractions, activity_id) {
            Some(PlaceKind::Attraction)
        } else if scheduled(&trip.restaurants, activity_id) {
            Some(PlaceKind::Restaurant)
        } else {
            None
        };

        if let Some(kind) = derived_kind {
            return self.clear_place_planning(trip_id, kind, activity_id);
        }

        let mut cached = self.storage().load_activities(trip_id)?;
        let before = cached.len();
        cached.retain(|a| a.id != activity_id);
        if cached.len() == before {
            return Err(StoreError::ActivityNotFound {
                trip_id: trip_id.to_string(),
                activity_id: activity_id.to_string(),
            });
        }
        self.storage().save_activities(trip_id, &cached)?;
        Ok(())
    }
}

fn scheduled(places: &[Place], id: &str) -> bool {
    places
        .iter()
        .any(|p| p.id == id && !p.planning.trim().is_empty())
}
