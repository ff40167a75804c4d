use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Typed operation failures. Unknown ids surface as `*NotFound` variants so
/// callers can tell "nothing matched" from "succeeded".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Place not found in trip {trip_id}: {place_id}")]
    PlaceNotFound { trip_id: String, place_id: String },

    #[error("Expense not found in trip {trip_id}: {expense_id}")]
    ExpenseNotFound {
        trip_id: String,
        expense_id: String,
    },

    #[error("Packing category not found in trip {trip_id}: {category}")]
    PackingCategoryNotFound { trip_id: String, category: String },

    #[error("Packing item not found in category {category}: {label}")]
    PackingItemNotFound { category: String, label: String },

    #[error("Activity not found in trip {trip_id}: {activity_id}")]
    ActivityNotFound {
        trip_id: String,
        activity_id: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}
