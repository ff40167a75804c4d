use models::{Budget, Destination, Expense, ExpenseCategory, Place, Trip, TripDates};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ids;

/// Converts a raw persisted trip record into the canonical shape.
///
/// Collections (`attractions`, `restaurants`, `mustSeeIds`, `packingList`)
/// coerce to empty when missing or non-array, and entries that no longer
/// deserialize are dropped rather than failing the whole trip. The budget is
/// migrated from the legacy breakdown shape when needed.
///
/// Idempotent, modulo id generation for entries that arrive without one.
/// Runs once per trip at load time and again for any record inserted through
/// `add_trip`/`update_trip`.
pub fn normalize_trip(raw: Value) -> Trip {
    let obj = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(ids::new_trip_id);

    let trip_status = obj
        .get("tripStatus")
        .or_else(|| obj.get("status"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    Trip {
        id,
        title: str_field(&obj, "title"),
        trip_status,
        cover_image: str_field(&obj, "coverImage"),
        destination: from_or_default::<Destination>(obj.get("destination")),
        dates: from_or_default::<TripDates>(obj.get("dates")),
        attractions: entry_list::<Place>(obj.get("attractions")),
        restaurants: entry_list::<Place>(obj.get("restaurants")),
        must_see_ids: string_list(obj.get("mustSeeIds")),
        packing_list: entry_list(obj.get("packingList")),
        budget: normalize_budget(obj.get("budget")),
    }
}

/// Persisted budget shapes. V2 is the canonical expense list; V1 is the
/// legacy fixed-category map. The two are told apart by the presence of an
/// `expenses` array, and migration runs only at this load boundary.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum BudgetRecord {
    V2(BudgetV2),
    V1(BudgetV1),
}

#[derive(Debug, serde::Deserialize)]
struct BudgetV2 {
    #[serde(default)]
    total: Value,
    expenses: Vec<Value>,
}

#[derive(Debug, serde::Deserialize)]
struct BudgetV1 {
    #[serde(default)]
    total: Value,
    #[serde(default)]
    breakdown: Map<String, Value>,
}

/// Legacy breakdown keys in their persisted order, with the canonical
/// expense title and category each one maps to.
const LEGACY_ROWS: &[(&str, &str, ExpenseCategory)] = &[
    ("flights", "Flights", ExpenseCategory::Transport),
    ("accommodation", "Accommodation", ExpenseCategory::Accommodation),
    ("food", "Food & Drinks", ExpenseCategory::FoodAndDrinks),
    ("transport", "Transport", ExpenseCategory::Transport),
    ("activities", "Activities", ExpenseCategory::Activities),
    ("other", "Other", ExpenseCategory::Other),
];

fn normalize_budget(raw: Option<&Value>) -> Budget {
    let Some(value) = raw else {
        return Budget::default();
    };
    match serde_json::from_value::<BudgetRecord>(value.clone()) {
        Ok(BudgetRecord::V2(v2)) => canonicalize(v2),
        Ok(BudgetRecord::V1(v1)) => migrate(v1),
        Err(_) => Budget::default(),
    }
}

/// Re-coerces an already-canonical budget: amounts to non-negative numbers,
/// `isPaid` to bool (default false), generated id when absent.
fn canonicalize(v2: BudgetV2) -> Budget {
    let expenses = v2
        .expenses
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let id = obj
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(ids::new_expense_id);
            Some(Expense {
                id,
                title: obj
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                amount: coerce_amount(obj.get("amount")),
                category: obj
                    .get("category")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                is_paid: obj.get("isPaid").and_then(|v| v.as_bool()).unwrap_or(false),
            })
        })
        .collect();

    Budget {
        total: coerce_amount(Some(&v2.total)),
        expenses,
    }
}

/// Migrates a legacy breakdown budget: one expense per present key, in the
/// fixed key order, all unpaid. The legacy `spent` field carried no paid
/// status and is discarded.
fn migrate(v1: BudgetV1) -> Budget {
    let expenses = LEGACY_ROWS
        .iter()
        .filter_map(|(key, title, category)| {
            let value = v1.breakdown.get(*key)?;
            Some(Expense {
                id: ids::new_expense_id(),
                title: (*title).to_string(),
                amount: coerce_amount(Some(value)),
                category: *category,
                is_paid: false,
            })
        })
        .collect();

    Budget {
        total: coerce_amount(Some(&v1.total)),
        expenses,
    }
}

/// `Number(x) || 0` semantics, clamped to non-negative: numbers pass
/// through, numeric strings parse (decimal comma accepted), everything else
/// becomes 0. NaN and negatives also become 0.
pub(crate) fn coerce_amount(raw: Option<&Value>) -> f64 {
    let x = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    };
    sanitize_amount(x)
}

/// Same clamp for amounts that are already numeric.
pub(crate) fn sanitize_amount(x: f64) -> f64 {
    if x.is_finite() && x >= 0.0 { x } else { 0.0 }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn from_or_default<T: DeserializeOwned + Default>(raw: Option<&Value>) -> T {
    raw.cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn entry_list<T: DeserializeOwned>(raw: Option<&Value>) -> Vec<T> {
    raw.and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .cloned()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn string_list(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::TripStatus;
    use serde_json::json;

    #[test]
    fn test_missing_collections_coerce_to_empty() {
        let trip = normalize_trip(json!({
            "id": "t1",
            "title": "Rome",
            "mustSeeIds": "not-an-array",
        }));

        assert!(trip.attractions.is_empty());
        assert!(trip.restaurants.is_empty());
        assert!(trip.must_see_ids.is_empty());
        assert!(trip.packing_list.is_empty());
        assert_eq!(trip.budget.total, 0.0);
    }

    #[test]
    fn test_legacy_status_key_is_accepted() {
        let trip = normalize_trip(json!({"id": "t1", "status": "ongoing"}));
        assert_eq!(trip.trip_status, TripStatus::Ongoing);

        let trip = normalize_trip(json!({"id": "t1", "status": "definitely-not-a-status"}));
        assert_eq!(trip.trip_status, TripStatus::Planned);
    }

    #[test]
    fn test_legacy_breakdown_migrates_to_expenses() {
        let trip = normalize_trip(json!({
            "id": "t1",
            "budget": {"total": 5000, "breakdown": {"flights": 1000, "food": 500}},
        }));

        assert_eq!(trip.budget.total, 5000.0);
        assert_eq!(trip.budget.expenses.len(), 2);

        let flights = &trip.budget.expenses[0];
        assert_eq!(flights.title, "Flights");
        assert_eq!(flights.category, ExpenseCategory::Transport);
        assert_eq!(flights.amount, 1000.0);
        assert!(!flights.is_paid);

        let food = &trip.budget.expenses[1];
        assert_eq!(food.title, "Food & Drinks");
        assert_eq!(food.category, ExpenseCategory::FoodAndDrinks);
        assert_eq!(food.amount, 500.0);
        assert!(!food.is_paid);
    }

    #[test]
    fn test_breakdown_order_follows_fixed_keys() {
        let trip = normalize_trip(json!({
            "id": "t1",
            "budget": {"total": 10900, "spent": 0, "breakdown": {
                "other": 800,
                "flights": 3500,
                "accommodation": 3600,
                "transport": 400,
                "food": 1400,
                "activities": 1200,
            }},
        }));

        let titles: Vec<&str> = trip
            .budget
            .expenses
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Flights",
                "Accommodation",
                "Food & Drinks",
                "Transport",
                "Activities",
                "Other"
            ]
        );
        assert_eq!(trip.budget.total, 10900.0);
    }

    #[test]
    fn test_canonical_expenses_are_coerced() {
        let trip = normalize_trip(json!({
            "id": "t1",
            "budget": {"total": "250,50", "expenses": [
                {"id": "e1", "title": "Museum", "amount": "12.5", "category": "Activities", "isPaid": true},
                {"title": "Snacks", "amount": "abc"},
                {"id": "e3", "title": "Ghost", "amount": -4},
            ]},
        }));

        assert_eq!(trip.budget.total, 250.5);
        assert_eq!(trip.budget.expenses.len(), 3);

        assert_eq!(trip.budget.expenses[0].amount, 12.5);
        assert!(trip.budget.expenses[0].is_paid);

        let snacks = &trip.budget.expenses[1];
        assert_eq!(snacks.amount, 0.0);
        assert!(!snacks.is_paid);
        assert!(snacks.id.starts_with("e_"));
        assert_eq!(snacks.category, ExpenseCategory::Other);

        assert_eq!(trip.budget.expenses[2].amount, 0.0);
    }

    #[test]
    fn test_normalize_is_idempotent_on_canonical_trips() {
        let first = normalize_trip(json!({
            "id": "t1",
            "title": "Barcelona Weekend Getaway",
            "tripStatus": "ongoing",
            "destination": {"city": "Barcelona", "country": "Spain"},
            "dates": {"start": "2025-11-21", "end": "2025-11-24", "nights": 3},
            "attractions": [{"id": "a1", "title": "Sagrada Família", "planning": "2025-11-22"}],
            "mustSeeIds": ["a1"],
            "packingList": [{"category": "Tech", "items": [{"label": "Power bank"}]}],
            "budget": {"total": 10900, "expenses": [
                {"id": "e1", "title": "Flights", "amount": 3500, "category": "Transport", "isPaid": true},
            ]},
        }));

        let second = normalize_trip(serde_json::to_value(&first).unwrap());

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_malformed_place_entries_are_dropped() {
        let trip = normalize_trip(json!({
            "id": "t1",
            "attractions": [
                {"id": "a1", "title": "Keep me"},
                {"title": "No id"},
                "just a string",
            ],
        }));

        assert_eq!(trip.attractions.len(), 1);
        assert_eq!(trip.attractions[0].id, "a1");
        assert_eq!(trip.attractions[0].duration_min, 90);
    }

    #[test]
    fn test_missing_id_gets_generated() {
        let trip = normalize_trip(json!({"title": "No id yet"}));
        assert!(trip.id.starts_with("t_"));
    }
}
