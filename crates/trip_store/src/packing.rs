use models::{PackingCategory, PackingItem};

use crate::error::{Result, StoreError};
use crate::keys::key_eq;
use crate::store::TripStore;

/// Packing checklist operations. Category names and item labels match
/// case-insensitively everywhere; duplicate inserts are skipped silently
/// and reported through the returned bool.
impl TripStore {
    /// Adds an item, creating the category if needed. Returns false when an
    /// item with the same label (case-insensitive) already exists in the
    /// category; the list is left untouched in that case.
    pub fn add_packing_item(&mut self, trip_id: &str, category: &str, label: &str) -> Result<bool> {
        let category = category.trim().to_string();
        let label = label.trim().to_string();
        let trip = self.trip_mut(trip_id)?;

        match trip
            .packing_list
            .iter_mut()
            .find(|c| key_eq(&c.category, &category))
        {
            Some(group) => {
                if group.items.iter().any(|i| key_eq(&i.label, &label)) {
                    tracing::debug!(trip = trip_id, %category, %label, "duplicate packing item skipped");
                    return Ok(false);
                }
                group.items.push(PackingItem {
                    label,
                    checked: false,
                });
            }
            None => trip.packing_list.push(PackingCategory {
                category,
                items: vec![PackingItem {
                    label,
                    checked: false,
                }],
            }),
        }

        self.persist()?;
        Ok(true)
    }

    /// Relabels an item and/or moves it to another category, preserving its
    /// checked state. A source category emptied by the move is removed.
    /// Returns false when the target already has an item with the new label.
    pub fn edit_packing_item(
        &mut self,
        trip_id: &str,
        category: &str,
        label: &str,
        new_category: Option<&str>,
        new_label: Option<&str>,
    ) -> Result<bool> {
        let target_category = new_category.unwrap_or(category).trim().to_string();
        let target_label = new_label.unwrap_or(label).trim().to_string();
        let trip = self.trip_mut(trip_id)?;

        let src_idx = trip
            .packing_list
            .iter()
            .position(|c| key_eq(&c.category, category))
            .ok_or_else(|| StoreError::PackingCategoryNotFound {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
            })?;
        let item_idx = trip.packing_list[src_idx]
            .items
            .iter()
            .position(|i| key_eq(&i.label, label))
            .ok_or_else(|| StoreError::PackingItemNotFound {
                category: category.to_string(),
                label: label.to_string(),
            })?;

        if key_eq(category, &target_category) {
            // Rename within the category; other items must not collide
            let group = &mut trip.packing_list[src_idx];
            let collides = group
                .items
                .iter()
                .enumerate()
                .any(|(i, item)| i != item_idx && key_eq(&item.label, &target_label));
            if collides {
                return Ok(false);
            }
            group.items[item_idx].label = target_label;
            self.persist()?;
            return Ok(true);
        }

        if let Some(target) = trip
            .packing_list
            .iter()
            .find(|c| key_eq(&c.category, &target_category))
        {
            if target.items.iter().any(|i| key_eq(&i.label, &target_label)) {
                return Ok(false);
            }
        }

        let mut item = trip.packing_list[src_idx].items.remove(item_idx);
        item.label = target_label;
        if trip.packing_list[src_idx].items.is_empty() {
            trip.packing_list.remove(src_idx);
        }

        match trip
            .packing_list
            .iter_mut()
            .find(|c| key_eq(&c.category, &target_category))
        {
            Some(group) => group.items.push(item),
            None => trip.packing_list.push(PackingCategory {
                category: target_category,
                items: vec![item],
            }),
        }

        self.persist()?;
        Ok(true)
    }

    /// Removes an item; with `remove_empty_category` the category goes too
    /// once its last item is gone.
    pub fn remove_packing_item(
        &mut self,
        trip_id: &str,
        category: &str,
        label: &str,
        remove_empty_category: bool,
    ) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;

        let cat_idx = trip
            .packing_list
            .iter()
            .position(|c| key_eq(&c.category, category))
            .ok_or_else(|| StoreError::PackingCategoryNotFound {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
            })?;

        let group = &mut trip.packing_list[cat_idx];
        let before = group.items.len();
        group.items.retain(|i| !key_eq(&i.label, label));
        if group.items.len() == before {
            return Err(StoreError::PackingItemNotFound {
                category: category.to_string(),
                label: label.to_string(),
            });
        }
        if group.items.is_empty() && remove_empty_category {
            trip.packing_list.remove(cat_idx);
        }

        self.persist()
    }

    /// Flips an item's checked state; returns the new state.
    pub fn toggle_packing_item(&mut self, trip_id: &str, category: &str, label: &str) -> Result<bool> {
        let trip = self.trip_mut(trip_id)?;

        let group = trip
            .packing_list
            .iter_mut()
            .find(|c| key_eq(&c.category, category))
            .ok_or_else(|| StoreError::PackingCategoryNotFound {
                trip_id: trip_id.to_string(),
                category: category.to_string(),
            })?;
        let item = group
            .items
            .iter_mut()
            .find(|i| key_eq(&i.label, label))
            .ok_or_else(|| StoreError::PackingItemNotFound {
                category: category.to_string(),
                label: label.to_string(),
            })?;

        item.checked = !item.checked;
        let checked = item.checked;
        self.persist()?;
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TripStore;
    use serde_json::json;
    use storage::MemoryStorage;

    fn store_with_packing() -> TripStore {
        let mem = MemoryStorage::new();
        mem.seed(
            "trips",
            &json!([{
                "id": "t1",
                "packingList": [
                    {"category": "Clothes", "items": [
                        {"label": "Light sneakers"},
                        {"label": "Jacket", "checked": true},
                    ]},
                    {"category": "Tech", "items": [{"label": "Power bank"}]},
                ],
            }])
            .to_string(),
        );
        TripStore::open(Box::new(mem)).unwrap()
    }

    fn item_count(store: &TripStore, category: &str) -> usize {
        store
            .trip("t1")
            .unwrap()
            .packing_list
            .iter()
            .find(|c| key_eq(&c.category, category))
            .map(|c| c.items.len())
            .unwrap_or(0)
    }

    #[test]
    fn test_duplicate_label_is_skipped_case_insensitively() {
        let mut store = store_with_packing();

        assert!(!store.add_packing_item("t1", "clothes", "JACKET").unwrap());
        assert_eq!(item_count(&store, "Clothes"), 2);

        assert!(store.add_packing_item("t1", "Clothes", "Scarf").unwrap());
        assert_eq!(item_count(&store, "Clothes"), 3);
    }

    #[test]
    fn test_new_category_is_created_on_insert() {
        let mut store = store_with_packing();

        assert!(store.add_packing_item("t1", "Documents", "Passport").unwrap());
        assert_eq!(store.trip("t1").unwrap().packing_list.len(), 3);
        assert_eq!(item_count(&store, "documents"), 1);
    }

    #[test]
    fn test_remove_last_item_drops_category_when_asked() {
        let mut store = store_with_packing();

        store
            .remove_packing_item("t1", "Tech", "power bank", true)
            .unwrap();
        assert!(store
            .trip("t1")
            .unwrap()
            .packing_list
            .iter()
            .all(|c| c.category != "Tech"));
    }

    #[test]
    fn test_remove_last_item_keeps_empty_category_by_default() {
        let mut store = store_with_packing();

        store
            .remove_packing_item("t1", "Tech", "Power bank", false)
            .unwrap();
        let trip = store.trip("t1").unwrap();
        let tech = trip
            .packing_list
            .iter()
            .find(|c| c.category == "Tech")
            .unwrap();
        assert!(tech.items.is_empty());
    }

    #[test]
    fn test_move_preserves_checked_and_removes_emptied_source() {
        let mut store = store_with_packing();

        assert!(store
            .edit_packing_item("t1", "Tech", "Power bank", Some("Clothes"), None)
            .unwrap());

        let trip = store.trip("t1").unwrap();
        assert!(trip.packing_list.iter().all(|c| c.category != "Tech"));

        store
            .edit_packing_item("t1", "Clothes", "Jacket", Some("Winter"), Some("Down jacket"))
            .unwrap();
        let trip = store.trip("t1").unwrap();
        let winter = trip
            .packing_list
            .iter()
            .find(|c| c.category == "Winter")
            .unwrap();
        assert!(winter.items[0].checked);
        assert_eq!(winter.items[0].label, "Down jacket");
    }

    #[test]
    fn test_move_into_duplicate_is_skipped() {
        let mut store = store_with_packing();
        store.add_packing_item("t1", "Tech", "Jacket").unwrap();

        assert!(!store
            .edit_packing_item("t1", "Tech", "Jacket", Some("Clothes"), None)
            .unwrap());
        assert_eq!(item_count(&store, "Tech"), 2);
        assert_eq!(item_count(&store, "Clothes"), 2);
    }

    #[test]
    fn test_rename_within_category_checks_collisions() {
        let mut store = store_with_packing();

        assert!(!store
            .edit_packing_item("t1", "Clothes", "Jacket", None, Some("light sneakers"))
            .unwrap());

        assert!(store
            .edit_packing_item("t1", "Clothes", "Jacket", None, Some("Rain jacket"))
            .unwrap());
        let trip = store.trip("t1").unwrap();
        let clothes = trip
            .packing_list
            .iter()
            .find(|c| c.category == "Clothes")
            .unwrap();
        assert!(clothes.items.iter().any(|i| i.label == "Rain jacket"));
    }

    #[test]
    fn test_toggle_packing_item() {
        let mut store = store_with_packing();

        assert!(store.toggle_packing_item("t1", "Tech", "Power bank").unwrap());
        assert!(!store.toggle_packing_item("t1", "Tech", "Power bank").unwrap());

        assert!(matches!(
            store.toggle_packing_item("t1", "Tech", "Missing"),
            Err(StoreError::PackingItemNotFound { .. })
        ));
        assert!(matches!(
            store.toggle_packing_item("t1", "Nope", "Power bank"),
            Err(StoreError::PackingCategoryNotFound { .. })
        ));
    }
}
