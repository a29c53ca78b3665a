//! Bike-tour planning: splits a route into daily stages, keeps the schedule
//! consistent through edits and tracks riding progress and expenses.

pub mod app;
pub mod db;
pub mod entities;
pub mod error;
pub mod expenses;
pub mod model;
pub mod progress;
pub mod route;
pub mod schedule;
pub mod util;

pub use error::AppError;
pub use expenses::{
    calculate_budget_status, get_expense_summary, group_expenses, sort_expenses,
};
pub use progress::calculate_trip_stats;
pub use route::split_route;
pub use schedule::{
    adjust_remaining_after_completion, insert_rest_day, remove_day, update_day_date,
    update_day_distance,
};
