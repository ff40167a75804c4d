//! Id generation. Prefixes follow the persisted snapshots: `t_` for trips,
//! `a_`/`r_` for places, `e_` for expenses, `act_` for manual calendar
//! entries.

use models::PlaceKind;
use uuid::Uuid;

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn new_trip_id() -> String {
    format!("t_{}", suffix())
}

pub fn new_place_id(kind: PlaceKind) -> String {
    match kind {
        PlaceKind::Attraction => format!("a_{}", suffix()),
        PlaceKind::Restaurant => format!("r_{}", suffix()),
    }
}

pub fn new_expense_id() -> String {
    format!("e_{}", suffix())
}

pub fn new_activity_id() -> String {
    format!("act_{}", suffix())
}
