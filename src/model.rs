use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::route::{Route, RouteSegment, RouteSource};

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Planned,
    InProgress,
    Completed,
    Skipped,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    /// Completed and skipped days never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    pub fn can_transition_to(&self, next: DayStatus) -> bool {
        matches!(
            (self, next),
            (Self::Planned, Self::InProgress)
                | (Self::Planned, Self::Skipped)
                | (Self::InProgress, Self::Completed)
        )
    }
}

impl FromStr for DayStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "planned" => Ok(Self::Planned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(AppError::InvalidParameter(format!(
                "unknown day status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Planning,
    Active,
    Paused,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for TripStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(AppError::InvalidParameter(format!(
                "unknown trip status: {other}"
            ))),
        }
    }
}

/// Variant order is the fixed display priority.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Accommodation,
    Food,
    Transport,
    Repairs,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        Self::Accommodation,
        Self::Food,
        Self::Transport,
        Self::Repairs,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accommodation => "accommodation",
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Repairs => "repairs",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Accommodation => "Accommodation",
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Repairs => "Repairs",
            Self::Other => "Other",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| AppError::InvalidParameter(format!("unknown expense category: {value}")))
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    None,
    Day,
    Category,
    Country,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
            Self::AmountDesc => "amount_desc",
            Self::AmountAsc => "amount_asc",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub amount: f64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_km: f64,
    pub target_km: f64,
    pub actual_km: Option<f64>,
    pub status: DayStatus,
    pub segment: Option<RouteSegment>,
    pub notes: Option<String>,
}

impl DayPlan {
    pub fn end_km(&self) -> f64 {
        self.start_km + self.target_km
    }

    /// Derived on every call; never stored.
    pub fn is_rest_day(&self) -> bool {
        self.target_km == 0.0 || self.status == DayStatus::Skipped
    }

    /// Distance credited to this day once ridden.
    pub fn ridden_km(&self) -> f64 {
        self.actual_km.unwrap_or(self.target_km)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub id: i64,
    pub name: String,
    pub route_source: RouteSource,
    pub daily_distance_km: f64,
    pub total_distance_km: f64,
    pub status: TripStatus,
    pub budget: Option<Budget>,
    pub days: Vec<DayPlan>,
}

impl TripPlan {
    pub fn day_index(&self, day_id: Uuid) -> Option<usize> {
        self.days.iter().position(|day| day.id == day_id)
    }

    /// Resolves a 1-based day position.
    pub fn day_at(&self, position: usize) -> Result<&DayPlan, AppError> {
        position
            .checked_sub(1)
            .and_then(|idx| self.days.get(idx))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "day {position} in trip id {} ({} days)",
                    self.id,
                    self.days.len()
                ))
            })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub trip_id: i64,
    pub day_plan_id: Option<Uuid>,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TripInput {
    pub name: String,
    pub route: Route,
    pub daily_distance_km: f64,
    pub start_date: NaiveDate,
    pub budget: Option<Budget>,
}

#[derive(Clone, Debug, Default)]
pub struct TripChanges {
    pub name: Option<String>,
    pub daily_distance_km: Option<f64>,
    pub status: Option<TripStatus>,
    pub budget: Option<Budget>,
    pub clear_budget: bool,
}

#[derive(Clone, Debug)]
pub struct ExpenseInput {
    pub day_plan_id: Option<Uuid>,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseChanges {
    pub day_plan_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseQuery {
    pub day_plan_id: Option<Uuid>,
    pub sort: Option<SortBy>,
}
