use serde::Serialize;

use crate::model::{DayPlan, DayStatus, TripPlan};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TripStats {
    pub total_distance_km: f64,
    pub completed_km: f64,
    /// Not clamped: riding past the planned total yields a negative value.
    pub remaining_km: f64,
    /// Not clamped: can exceed 100.
    pub progress_percent: f64,
    pub total_days: usize,
    pub completed_days: usize,
    pub remaining_days: usize,
    pub rest_days: usize,
}

pub fn calculate_trip_stats(trip: &TripPlan) -> TripStats {
    let completed: Vec<&DayPlan> = trip
        .days
        .iter()
        .filter(|day| day.status == DayStatus::Completed)
        .collect();
    let completed_km: f64 = completed.iter().map(|day| day.ridden_km()).sum();
    let progress_percent = if trip.total_distance_km > 0.0 {
        completed_km / trip.total_distance_km * 100.0
    } else {
        0.0
    };

    TripStats {
        total_distance_km: trip.total_distance_km,
        completed_km,
        remaining_km: trip.total_distance_km - completed_km,
        progress_percent,
        total_days: trip.days.len(),
        completed_days: completed.len(),
        remaining_days: trip.days.len() - completed.len(),
        rest_days: trip.days.iter().filter(|day| day.is_rest_day()).count(),
    }
}

/// First day that still needs riding, with its 1-based position.
pub fn next_riding_day(trip: &TripPlan) -> Option<(usize, &DayPlan)> {
    trip.days
        .iter()
        .enumerate()
        .find(|(_, day)| !day.status.is_terminal() && !day.is_rest_day())
        .map(|(idx, day)| (idx + 1, day))
}
