
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Trip models
//
// Field names serialize in the camelCase shape of the persisted snapshots,
// so an existing `trips` document loads unchanged.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
	#[default]
	Planned,
	Ongoing,
	Completed,
}

impl fmt::Display for TripStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TripStatus::Planned => write!(f, "planned"),
			TripStatus::Ongoing => write!(f, "ongoing"),
			TripStatus::Completed => write!(f, "completed"),
		}
	}
}

impl FromStr for TripStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"planned" => Ok(TripStatus::Planned),
			"ongoing" => Ok(TripStatus::Ongoing),
			"completed" => Ok(TripStatus::Completed),
			other => Err(format!("unknown trip status '{}'", other)),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Destination {
	#[serde(default)]
	pub city: String,
	#[serde(default)]
	pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TripDates {
	#[serde(default)]
	pub start: String,
	#[serde(default)]
	pub end: String,
	#[serde(default)]
	pub nights: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default, alias = "status")]
	pub trip_status: TripStatus,
	#[serde(default)]
	pub cover_image: String,
	#[serde(default)]
	pub destination: Destination,
	#[serde(default)]
	pub dates: TripDates,
	#[serde(default)]
	pub attractions: Vec<Place>,
	#[serde(default)]
	pub restaurants: Vec<Place>,
	#[serde(default)]
	pub must_see_ids: Vec<String>,
	#[serde(default)]
	pub packing_list: Vec<PackingCategory>,
	#[serde(default)]
	pub budget: Budget,
}

// Places (attractions and restaurants share one shape)

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceKind {
	Attraction,
	Restaurant,
}

impl fmt::Display for PlaceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PlaceKind::Attraction => write!(f, "Attraction"),
			PlaceKind::Restaurant => write!(f, "Restaurant"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub category: String,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub rating: Option<f64>,
	#[serde(default)]
	pub price_level: String,
	#[serde(default)]
	pub expected_cost: f64,
	#[serde(default = "default_duration_min")]
	pub duration_min: u32,
	#[serde(default)]
	pub opening_hours: String,
	#[serde(default)]
	pub image: String,
	/// ISO date the place is scheduled for; empty means not yet scheduled.
	#[serde(default)]
	pub planning: String,
	#[serde(default)]
	pub time: String,
	#[serde(default)]
	pub end_time: String,
}

fn default_duration_min() -> u32 {
	90
}

// Packing list

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingItem {
	pub label: String,
	#[serde(default)]
	pub checked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackingCategory {
	pub category: String,
	#[serde(default)]
	pub items: Vec<PackingItem>,
}

// Budget

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExpenseCategory {
	Transport,
	Accommodation,
	#[serde(rename = "Food & Drinks")]
	FoodAndDrinks,
	Activities,
	Shopping,
	#[default]
	Other,
}

impl fmt::Display for ExpenseCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExpenseCategory::Transport => write!(f, "Transport"),
			ExpenseCategory::Accommodation => write!(f, "Accommodation"),
			ExpenseCategory::FoodAndDrinks => write!(f, "Food & Drinks"),
			ExpenseCategory::Activities => write!(f, "Activities"),
			ExpenseCategory::Shopping => write!(f, "Shopping"),
			ExpenseCategory::Other => write!(f, "Other"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub amount: f64,
	#[serde(default)]
	pub category: ExpenseCategory,
	#[serde(default)]
	pub is_paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Budget {
	#[serde(default)]
	pub total: f64,
	#[serde(default)]
	pub expenses: Vec<Expense>,
}

// Calendar

/// Denormalized calendar entry, cached per trip. Derived entries carry the id
/// of the place they project; manually added entries have their own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarActivity {
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(rename = "type")]
	pub kind: PlaceKind,
	#[serde(default)]
	pub image: String,
	#[serde(default)]
	pub day: String,
	#[serde(default)]
	pub time: String,
	#[serde(default)]
	pub end_time: String,
}
