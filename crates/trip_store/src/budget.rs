use models::{Expense, ExpenseCategory, Trip, TripStatus};

use crate::error::{Result, StoreError};
use crate::ids;
use crate::keys::{key_eq, norm_key};
use crate::normalize::sanitize_amount;
use crate::store::TripStore;

/// Input for a new expense; the id is generated on insert.
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub is_paid: bool,
}

/// Partial update for an expense; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<ExpenseCategory>,
    pub is_paid: Option<bool>,
}

impl TripStore {
    pub fn add_expense(&mut self, trip_id: &str, expense: NewExpense) -> Result<String> {
        let trip = self.trip_mut(trip_id)?;
        let id = ids::new_expense_id();
        trip.budget.expenses.push(Expense {
            id: id.clone(),
            title: expense.title.trim().to_string(),
            amount: sanitize_amount(expense.amount),
            category: expense.category,
            is_paid: expense.is_paid,
        });
        self.persist()?;
        Ok(id)
    }

    pub fn edit_expense(&mut self, trip_id: &str, expense_id: &str, patch: ExpensePatch) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;
        let expense = trip
            .budget
            .expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| StoreError::ExpenseNotFound {
                trip_id: trip_id.to_string(),
                expense_id: expense_id.to_string(),
            })?;

        if let Some(title) = patch.title {
            expense.title = title.trim().to_string();
        }
        if let Some(amount) = patch.amount {
            expense.amount = sanitize_amount(amount);
        }
        if let Some(category) = patch.category {
            expense.category = category;
        }
        if let Some(is_paid) = patch.is_paid {
            expense.is_paid = is_paid;
        }

        self.persist()
    }

    pub fn remove_expense(&mut self, trip_id: &str, expense_id: &str) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;
        let before = trip.budget.expenses.len();
        trip.budget.expenses.retain(|e| e.id != expense_id);
        if trip.budget.expenses.len() == before {
            return Err(StoreError::ExpenseNotFound {
                trip_id: trip_id.to_string(),
                expense_id: expense_id.to_string(),
            });
        }
        self.persist()
    }

    pub fn set_expense_paid(&mut self, trip_id: &str, expense_id: &str, is_paid: bool) -> Result<()> {
        self.edit_expense(
            trip_id,
            expense_id,
            ExpensePatch {
                is_paid: Some(is_paid),
                ..Default::default()
            },
        )
    }

    /// Sets the planned total from raw input. Unparsable or negative values
    /// become 0, never an error.
    pub fn set_budget_total(&mut self, trip_id: &str, raw: &str) -> Result<()> {
        let total = parse_amount(raw);
        let trip = self.trip_mut(trip_id)?;
        trip.budget.total = total;
        self.persist()
    }

    // Legacy-compatible category API: the old budget view edited a
    // category -> amount map, so these operate by title match against the
    // expense list and infer the canonical category from the free-text name.

    /// Map-write semantics: updates the amount of the expense whose title
    /// matches, or appends a new unpaid expense.
    pub fn add_breakdown_item(&mut self, trip_id: &str, name: &str, amount: f64) -> Result<()> {
        self.upsert_by_title(trip_id, name, amount)
    }

    pub fn set_breakdown_value(&mut self, trip_id: &str, name: &str, amount: f64) -> Result<()> {
        self.upsert_by_title(trip_id, name, amount)
    }

    /// Renames a budget row, recomputing its category from the new name.
    pub fn rename_breakdown_category(&mut self, trip_id: &str, old: &str, new: &str) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;
        let expense = trip
            .budget
            .expenses
            .iter_mut()
            .find(|e| key_eq(&e.title, old))
            .ok_or_else(|| StoreError::ExpenseNotFound {
                trip_id: trip_id.to_string(),
                expense_id: old.to_string(),
            })?;
        expense.title = new.trim().to_string();
        expense.category = infer_category(new);
        self.persist()
    }

    pub fn remove_breakdown_item(&mut self, trip_id: &str, name: &str) -> Result<()> {
        let trip = self.trip_mut(trip_id)?;
        let before = trip.budget.expenses.len();
        trip.budget.expenses.retain(|e| !key_eq(&e.title, name));
        if trip.budget.expenses.len() == before {
            return Err(StoreError::ExpenseNotFound {
                trip_id: trip_id.to_string(),
                expense_id: name.to_string(),
            });
        }
        self.persist()
    }

    /// Cross-trip aggregate for dashboard reporting: spent across all
    /// ongoing trips.
    pub fn ongoing_spent_total(&self) -> f64 {
        self.trips()
            .iter()
            .filter(|t| t.trip_status == TripStatus::Ongoing)
            .map(trip_spent)
            .sum()
    }

    fn upsert_by_title(&mut self, trip_id: &str, name: &str, amount: f64) -> Result<()> {
        let amount = sanitize_amount(amount);
        let trip = self.trip_mut(trip_id)?;
        match trip
            .budget
            .expenses
            .iter_mut()
            .find(|e| key_eq(&e.title, name))
        {
            Some(expense) => expense.amount = amount,
            None => trip.budget.expenses.push(Expense {
                id: ids::new_expense_id(),
                title: name.trim().to_string(),
                amount,
                category: infer_category(name),
                is_paid: false,
            }),
        }
        self.persist()
    }
}

/// Money actually spent on a trip: the sum of paid expenses. A planned trip
/// has spent nothing yet no matter what is logged.
pub fn trip_spent(trip: &Trip) -> f64 {
    if trip.trip_status == TripStatus::Planned {
        return 0.0;
    }
    trip.budget
        .expenses
        .iter()
        .filter(|e| e.is_paid)
        .map(|e| e.amount)
        .sum()
}

/// Display-only remainder, clamped at zero; storage keeps the raw total.
pub fn remaining(trip: &Trip) -> f64 {
    (trip.budget.total - trip_spent(trip)).max(0.0)
}

/// Parses raw amount input with `Number(x) || 0` semantics: decimal comma
/// accepted, anything unparsable or negative becomes 0.
pub fn parse_amount(raw: &str) -> f64 {
    sanitize_amount(raw.trim().replace(',', ".").parse().unwrap_or(0.0))
}

/// Free-text budget row name to canonical category, by keyword.
pub fn infer_category(name: &str) -> ExpenseCategory {
    let key = norm_key(name);
    if key == "flights" {
        return ExpenseCategory::Transport;
    }
    if key == "accommodation" {
        return ExpenseCategory::Accommodation;
    }
    if key.contains("food") {
        return ExpenseCategory::FoodAndDrinks;
    }
    if key.contains("transport") {
        return ExpenseCategory::Transport;
    }
    if key.contains("activit") {
        return ExpenseCategory::Activities;
    }
    if key.contains("shop") {
        return ExpenseCategory::Shopping;
    }
    ExpenseCategory::Other
}
