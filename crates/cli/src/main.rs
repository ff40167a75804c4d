use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use models::{CalendarActivity, Place, PlaceKind, Trip, TripStatus};
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use storage::FileStorage;
use trip_store::budget::{parse_amount, remaining, trip_spent, NewExpense};
use trip_store::calendar::{day_activities, trip_days};
use trip_store::{must_sees, PlacePatch, TripStore};

#[derive(Parser, Debug)]
#[command(name = "triptailor", about = "Plan trips: places, must-sees, packing, budget and calendar.")]
struct Cli {
    /// Directory for the JSON snapshot; defaults to $TRIPTAILOR_DATA_DIR, then ./data
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Attraction,
    Restaurant,
}

impl From<KindArg> for PlaceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Attraction => PlaceKind::Attraction,
            KindArg::Restaurant => PlaceKind::Restaurant,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List trips, optionally filtered by status
    Trips {
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one trip in full
    Show { trip_id: String },
    /// Create a trip
    AddTrip {
        title: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        country: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "")]
        cover_image: String,
    },
    /// Delete a trip and its calendar cache
    RemoveTrip { trip_id: String },
    /// Set a trip's status (planned, ongoing, completed)
    SetStatus { trip_id: String, status: String },

    /// Add an attraction or restaurant
    AddPlace {
        trip_id: String,
        kind: KindArg,
        title: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long, default_value = "")]
        price_level: String,
        #[arg(long, default_value_t = 0.0)]
        expected_cost: f64,
        #[arg(long, default_value_t = 90)]
        duration_min: u32,
        #[arg(long, default_value = "")]
        opening_hours: String,
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Edit fields of a place
    EditPlace {
        trip_id: String,
        kind: KindArg,
        place_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        rating: Option<f64>,
        #[arg(long)]
        price_level: Option<String>,
        #[arg(long)]
        expected_cost: Option<f64>,
        #[arg(long)]
        duration_min: Option<u32>,
        #[arg(long)]
        opening_hours: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a place (also scrubbed from must-sees and the calendar)
    RemovePlace {
        trip_id: String,
        kind: KindArg,
        place_id: String,
    },
    /// Schedule a place on a date within the trip range
    Plan {
        trip_id: String,
        kind: KindArg,
        place_id: String,
        date: String,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        end_time: Option<String>,
    },
    /// Unschedule a place, keeping it on its list
    Unplan {
        trip_id: String,
        kind: KindArg,
        place_id: String,
    },

    /// Toggle a place on the must-see list
    MustSee { trip_id: String, item_id: String },
    /// Show the must-see list
    MustSees { trip_id: String },

    /// Show the packing list with progress
    Packing { trip_id: String },
    /// Add a packing item (category created on demand)
    PackAdd {
        trip_id: String,
        category: String,
        label: String,
    },
    /// Toggle a packing item's checked state
    PackToggle {
        trip_id: String,
        category: String,
        label: String,
    },
    /// Remove a packing item
    PackRemove {
        trip_id: String,
        category: String,
        label: String,
        /// Keep the category even when its last item is removed
        #[arg(long)]
        keep_category: bool,
    },
    /// Relabel a packing item and/or move it to another category
    PackMove {
        trip_id: String,
        category: String,
        label: String,
        #[arg(long)]
        to_category: Option<String>,
        #[arg(long)]
        to_label: Option<String>,
    },

    /// Show budget totals and expense rows
    Budget { trip_id: String },
    /// Set the planned total (free-form input, bad values become 0)
    SetBudget { trip_id: String, total: String },
    /// Add an expense
    AddExpense {
        trip_id: String,
        title: String,
        amount: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        paid: bool,
    },
    /// Mark an expense paid (or unpaid with --unpaid)
    PayExpense {
        trip_id: String,
        expense_id: String,
        #[arg(long)]
        unpaid: bool,
    },
    /// Remove an expense
    RemoveExpense { trip_id: String, expense_id: String },
    /// Set a budget row by name, creating it when absent
    BudgetSetRow {
        trip_id: String,
        name: String,
        amount: String,
    },
    /// Rename a budget row, recomputing its category
    BudgetRenameRow {
        trip_id: String,
        old: String,
        new: String,
    },
    /// Remove a budget row by name
    BudgetRemoveRow { trip_id: String, name: String },

    /// Show the calendar, one section per day (or a single day with --date)
    Calendar {
        trip_id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Add an ad-hoc calendar entry not backed by a place
    AddActivity {
        trip_id: String,
        name: String,
        day: String,
        #[arg(long, default_value = "attraction")]
        kind: KindArg,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        end_time: Option<String>,
    },
    /// Delete a calendar entry (derived entries are unscheduled instead)
    RemoveActivity { trip_id: String, activity_id: String },

    /// Total spent across all ongoing trips
    Spent,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cli=info,trip_store=info,storage=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("TRIPTAILOR_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));

    let mut store = TripStore::open(Box::new(FileStorage::new(&data_dir)))
        .with_context(|| format!("opening trip store at {}", data_dir.display()))?;
    tracing::debug!(dir = %data_dir.display(), "trip store ready");

    match cli.command {
        Command::Trips { status } => {
            let trips: Vec<&Trip> = match status {
                Some(raw) => {
                    let status: TripStatus = raw.parse().map_err(|e: String| anyhow!(e))?;
                    store.trips_with_status(status)
                }
                None => store.trips().iter().collect(),
            };
            if trips.is_empty() {
                println!("No trips yet.");
            }
            for trip in trips {
                println!(
                    "{}  {} ({}, {}) [{}] {} – {}",
                    trip.id,
                    trip.title,
                    trip.destination.city,
                    trip.destination.country,
                    trip.trip_status,
                    trip.dates.start,
                    trip.dates.end,
                );
            }
        }
        Command::Show { trip_id } => {
            let trip = fetch(&store, &trip_id)?;
            println!("{} ({}) [{}]", trip.title, trip.id, trip.trip_status);
            println!(
                "{}, {}  {} – {} ({} nights)",
                trip.destination.city,
                trip.destination.country,
                trip.dates.start,
                trip.dates.end,
                trip.dates.nights,
            );
            println!("Attractions:");
            for p in &trip.attractions {
                print_place(p);
            }
            println!("Restaurants:");
            for p in &trip.restaurants {
                print_place(p);
            }
            println!(
                "Budget: {:.2} planned, {:.2} spent, {:.2} remaining",
                trip.budget.total,
                trip_spent(trip),
                remaining(trip),
            );
        }
        Command::AddTrip {
            title,
            city,
            country,
            start,
            end,
            cover_image,
        } => {
            let start_day = parse_date(&start)?;
            let end_day = parse_date(&end)?;
            if end_day < start_day {
                return Err(anyhow!("trip end {} is before start {}", end, start));
            }
            let nights = (end_day - start_day).num_days();
            let id = store.add_trip(json!({
                "title": title,
                "tripStatus": "planned",
                "coverImage": cover_image,
                "destination": {"city": city, "country": country},
                "dates": {"start": start, "end": end, "nights": nights},
            }))?;
            println!("Created trip {}", id);
        }
        Command::RemoveTrip { trip_id } => {
            store.remove_trip(&trip_id)?;
            println!("Removed trip {}", trip_id);
        }
        Command::SetStatus { trip_id, status } => {
            let status: TripStatus = status.parse().map_err(|e: String| anyhow!(e))?;
            store.set_trip_status(&trip_id, status)?;
            println!("Trip {} is now {}", trip_id, status);
        }

        Command::AddPlace {
            trip_id,
            kind,
            title,
            category,
            address,
            rating,
            price_level,
            expected_cost,
            duration_min,
            opening_hours,
            image,
        } => {
            let kind: PlaceKind = kind.into();
            let place = Place {
                id: String::new(),
                title,
                category: category.unwrap_or_else(|| kind.to_string()),
                address,
                description: String::new(),
                rating,
                price_level,
                expected_cost,
                duration_min,
                opening_hours,
                image,
                planning: String::new(),
                time: String::new(),
                end_time: String::new(),
            };
            let id = store.add_place(&trip_id, kind, place)?;
            println!("Added {} {}", kind, id);
        }
        Command::EditPlace {
            trip_id,
            kind,
            place_id,
            title,
            category,
            address,
            rating,
            price_level,
            expected_cost,
            duration_min,
            opening_hours,
            image,
        } => {
            let patch = PlacePatch {
                title,
                category,
                address,
                rating: rating.map(Some),
                price_level,
                expected_cost,
                duration_min,
                opening_hours,
                image,
                ..Default::default()
            };
            store.edit_place(&trip_id, kind.into(), &place_id, patch)?;
            println!("Updated {}", place_id);
        }
        Command::RemovePlace {
            trip_id,
            kind,
            place_id,
        } => {
            store.remove_place(&trip_id, kind.into(), &place_id)?;
            println!("Removed {}", place_id);
        }
        Command::Plan {
            trip_id,
            kind,
            place_id,
            date,
            time,
            end_time,
        } => {
            parse_date(&date)?;
            ensure_in_trip_range(fetch(&store, &trip_id)?, &date)?;
            if let Some(t) = &time {
                parse_time(t)?;
            }
            if let Some(t) = &end_time {
                parse_time(t)?;
            }
            let patch = PlacePatch {
                planning: Some(date.clone()),
                time,
                end_time,
                ..Default::default()
            };
            store.edit_place(&trip_id, kind.into(), &place_id, patch)?;
            println!("Scheduled {} on {}", place_id, date);
        }
        Command::Unplan {
            trip_id,
            kind,
            place_id,
        } => {
            store.clear_place_planning(&trip_id, kind.into(), &place_id)?;
            println!("Unscheduled {}", place_id);
        }

        Command::MustSee { trip_id, item_id } => {
            let now_must_see = store.toggle_must_see(&trip_id, &item_id)?;
            if now_must_see {
                println!("{} marked as must-see", item_id);
            } else {
                println!("{} removed from must-sees", item_id);
            }
        }
        Command::MustSees { trip_id } => {
            let trip = fetch(&store, &trip_id)?;
            let places = must_sees(trip);
            if places.is_empty() {
                println!("No must-sees yet.");
            }
            for p in places {
                println!("{}  {} ({})", p.id, p.title, p.category);
            }
        }

        Command::Packing { trip_id } => {
            let trip = fetch(&store, &trip_id)?;
            let total: usize = trip.packing_list.iter().map(|c| c.items.len()).sum();
            let checked: usize = trip
                .packing_list
                .iter()
                .flat_map(|c| c.items.iter())
                .filter(|i| i.checked)
                .count();
            println!("{}/{} packed", checked, total);
            for group in &trip.packing_list {
                println!("{}:", group.category);
                for item in &group.items {
                    let mark = if item.checked { "x" } else { " " };
                    println!("  [{}] {}", mark, item.label);
                }
            }
        }
        Command::PackAdd {
            trip_id,
            category,
            label,
        } => {
            if store.add_packing_item(&trip_id, &category, &label)? {
                println!("Added '{}' to {}", label, category);
            } else {
                println!("'{}' is already on the {} list", label, category);
            }
        }
        Command::PackToggle {
            trip_id,
            category,
            label,
        } => {
            let checked = store.toggle_packing_item(&trip_id, &category, &label)?;
            println!("'{}' is now {}", label, if checked { "packed" } else { "unpacked" });
        }
        Command::PackRemove {
            trip_id,
            category,
            label,
            keep_category,
        } => {
            store.remove_packing_item(&trip_id, &category, &label, !keep_category)?;
            println!("Removed '{}'", label);
        }
        Command::PackMove {
            trip_id,
            category,
            label,
            to_category,
            to_label,
        } => {
            let moved = store.edit_packing_item(
                &trip_id,
                &category,
                &label,
                to_category.as_deref(),
                to_label.as_deref(),
            )?;
            if moved {
                println!("Moved '{}'", label);
            } else {
                println!("Target already has an item with that label; nothing moved");
            }
        }

        Command::Budget { trip_id } => {
            let trip = fetch(&store, &trip_id)?;
            println!(
                "Planned {:.2} | Spent {:.2} | Remaining {:.2}",
                trip.budget.total,
                trip_spent(trip),
                remaining(trip),
            );
            for e in &trip.budget.expenses {
                let mark = if e.is_paid { "paid" } else { "open" };
                println!(
                    "{}  {:<24} {:>10.2}  {:<14} [{}]",
                    e.id,
                    e.title,
                    e.amount,
                    e.category.to_string(),
                    mark
                );
            }
        }
        Command::SetBudget { trip_id, total } => {
            store.set_budget_total(&trip_id, &total)?;
            println!(
                "Planned total is now {:.2}",
                fetch(&store, &trip_id)?.budget.total
            );
        }
        Command::AddExpense {
            trip_id,
            title,
            amount,
            category,
            paid,
        } => {
            let category = match category {
                Some(raw) => trip_store::budget::infer_category(&raw),
                None => trip_store::budget::infer_category(&title),
            };
            let id = store.add_expense(
                &trip_id,
                NewExpense {
                    title,
                    amount: parse_amount(&amount),
                    category,
                    is_paid: paid,
                },
            )?;
            println!("Added expense {}", id);
        }
        Command::PayExpense {
            trip_id,
            expense_id,
            unpaid,
        } => {
            store.set_expense_paid(&trip_id, &expense_id, !unpaid)?;
            println!("{} marked {}", expense_id, if unpaid { "unpaid" } else { "paid" });
        }
        Command::RemoveExpense {
            trip_id,
            expense_id,
        } => {
            store.remove_expense(&trip_id, &expense_id)?;
            println!("Removed expense {}", expense_id);
        }
        Command::BudgetSetRow {
            trip_id,
            name,
            amount,
        } => {
            store.set_breakdown_value(&trip_id, &name, parse_amount(&amount))?;
            println!("Set '{}' to {:.2}", name, parse_amount(&amount));
        }
        Command::BudgetRenameRow { trip_id, old, new } => {
            store.rename_breakdown_category(&trip_id, &old, &new)?;
            println!("Renamed '{}' to '{}'", old, new);
        }
        Command::BudgetRemoveRow { trip_id, name } => {
            store.remove_breakdown_item(&trip_id, &name)?;
            println!("Removed '{}'", name);
        }

        Command::Calendar { trip_id, date } => {
            let trip = fetch(&store, &trip_id)?;
            let activities = store.activities(&trip_id)?;
            let days: Vec<NaiveDate> = match date {
                Some(raw) => vec![parse_date(&raw)?],
                None => trip_days(&trip.dates),
            };
            for day in days {
                let key = day.format("%Y-%m-%d").to_string();
                println!("{}", day.format("%A, %-d %B"));
                let todays = day_activities(&activities, &key);
                if todays.is_empty() {
                    println!("  (nothing planned)");
                }
                for a in todays {
                    let window = match (a.time.as_str(), a.end_time.as_str()) {
                        ("", _) => String::new(),
                        (start, "") => format!("{} ", start),
                        (start, end) => format!("{}–{} ", start, end),
                    };
                    println!("  {}{} ({})  [{}]", window, a.name, a.kind, a.id);
                }
            }
        }
        Command::AddActivity {
            trip_id,
            name,
            day,
            kind,
            time,
            end_time,
        } => {
            parse_date(&day)?;
            ensure_in_trip_range(fetch(&store, &trip_id)?, &day)?;
            if let Some(t) = &time {
                parse_time(t)?;
            }
            if let Some(t) = &end_time {
                parse_time(t)?;
            }
            let activity = CalendarActivity {
                id: String::new(),
                name,
                kind: kind.into(),
                image: String::new(),
                day,
                time: time.unwrap_or_default(),
                end_time: end_time.unwrap_or_default(),
            };
            let id = store.add_custom_activity(&trip_id, activity)?;
            println!("Added activity {}", id);
        }
        Command::RemoveActivity {
            trip_id,
            activity_id,
        } => {
            store.remove_activity(&trip_id, &activity_id)?;
            println!("Removed activity {}", activity_id);
        }

        Command::Spent => {
            println!("{:.2}", store.ongoing_spent_total());
        }
    }

    Ok(())
}

fn fetch<'a>(store: &'a TripStore, trip_id: &str) -> Result<&'a Trip> {
    store
        .trip(trip_id)
        .ok_or_else(|| anyhow!("trip not found: {}", trip_id))
}

fn print_place(p: &Place) {
    let planned = if p.planning.is_empty() {
        String::new()
    } else {
        format!("  planned {}", p.planning)
    };
    println!("  {}  {} ({}){}", p.id, p.title, p.category, planned);
}

/// YYYY-MM-DD, and a real calendar date.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let re = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    if !re.is_match(raw) {
        return Err(anyhow!("invalid date '{}', expected YYYY-MM-DD", raw));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("'{}' is not a valid calendar date", raw))
}

/// HH:MM, 24-hour.
fn parse_time(raw: &str) -> Result<()> {
    let re = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
    if !re.is_match(raw) {
        return Err(anyhow!("invalid time '{}', expected HH:MM", raw));
    }
    Ok(())
}

/// The range check the planning date widget performed: the store itself
/// accepts any date.
fn ensure_in_trip_range(trip: &Trip, date: &str) -> Result<()> {
    let day = parse_date(date)?;
    let start = NaiveDate::parse_from_str(trip.dates.start.trim(), "%Y-%m-%d");
    let end = NaiveDate::parse_from_str(trip.dates.end.trim(), "%Y-%m-%d");
    if let (Ok(start), Ok(end)) = (start, end) {
        if day < start || day > end {
            return Err(anyhow!(
                "{} is outside the trip range {} – {}",
                date,
                trip.dates.start,
                trip.dates.end
            ));
        }
    }
    Ok(())
}
