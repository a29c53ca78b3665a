//! Cascading edits over a trip's day list.
//!
//! Every operation takes the current, date-sorted and contiguous day list and
//! returns a fresh list; the input is never touched, so a rejected edit leaves
//! the caller's state exactly as it was.

use chrono::{Days, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{DayPlan, DayStatus, TripPlan, TripStatus};
use crate::route::{RouteSegment, KM_EPSILON};

pub const FINISHED_AHEAD_NOTE: &str = "Route already finished; day not needed";

pub fn update_day_distance(
    days: &[DayPlan],
    day_id: Uuid,
    new_target_km: f64,
) -> Result<Vec<DayPlan>, AppError> {
    if !new_target_km.is_finite() || new_target_km < 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "day distance cannot be negative, got {new_target_km}"
        )));
    }
    let idx = find_day(days, day_id)?;

    let mut updated = days.to_vec();
    updated[idx].target_km = new_target_km;
    sync_segment(&mut updated[idx]);
    recompute_boundaries(&mut updated, idx + 1, 0.0);

    debug!(%day_id, new_target_km, "updated day distance");
    Ok(updated)
}

pub fn update_day_date(
    days: &[DayPlan],
    day_id: Uuid,
    new_date: NaiveDate,
) -> Result<Vec<DayPlan>, AppError> {
    let idx = find_day(days, day_id)?;
    if let Some(position) = days
        .iter()
        .position(|day| day.id != day_id && day.date == new_date)
    {
        return Err(AppError::Conflict(format!(
            "date {new_date} is already used by day {}",
            position + 1
        )));
    }

    let origin_km = days.first().map(|day| day.start_km).unwrap_or(0.0);
    let mut updated = days.to_vec();
    updated[idx].date = new_date;
    updated.sort_by_key(|day| day.date);
    recompute_boundaries(&mut updated, 0, origin_km);

    debug!(%day_id, %new_date, "moved day");
    Ok(updated)
}

/// Inserts a skipped zero-km day right after `after_day_id` and pushes every
/// later day back by one calendar day.
pub fn insert_rest_day(days: &[DayPlan], after_day_id: Uuid) -> Result<Vec<DayPlan>, AppError> {
    let idx = find_day(days, after_day_id)?;
    let anchor = &days[idx];
    let rest_date = next_date(anchor.date)?;

    let mut updated = Vec::with_capacity(days.len() + 1);
    for day in days {
        let mut day = day.clone();
        if day.date > anchor.date {
            day.date = next_date(day.date)?;
        }
        updated.push(day);
    }

    let start_km = anchor.end_km();
    let segment = anchor.segment.map(|segment| RouteSegment {
        start_km,
        end_km: start_km,
        start: segment.end,
        end: segment.end,
    });
    updated.insert(
        idx + 1,
        DayPlan {
            id: Uuid::new_v4(),
            date: rest_date,
            start_km,
            target_km: 0.0,
            actual_km: None,
            status: DayStatus::Skipped,
            segment,
            notes: None,
        },
    );
    recompute_boundaries(&mut updated, idx + 1, 0.0);

    debug!(%after_day_id, %rest_date, "inserted rest day");
    Ok(updated)
}

pub fn remove_day(days: &[DayPlan], day_id: Uuid) -> Result<Vec<DayPlan>, AppError> {
    let idx = find_day(days, day_id)?;
    if days.len() == 1 {
        return Err(AppError::InvalidOperation(
            "cannot remove the only day of a trip".to_string(),
        ));
    }

    let mut updated = days.to_vec();
    let removed = updated.remove(idx);
    recompute_boundaries(&mut updated, idx, removed.start_km);

    debug!(%day_id, remaining = updated.len(), "removed day");
    Ok(updated)
}

/// Spreads whatever distance is still left after `through_index` evenly over
/// the remaining riding days, or skips the unstarted ones when the route is
/// done. Days up to `through_index` take their ridden distance as target so
/// the chain stays contiguous.
pub fn adjust_remaining_after_completion(
    trip: &TripPlan,
    through_index: usize,
) -> Result<Vec<DayPlan>, AppError> {
    if through_index >= trip.days.len() {
        return Err(AppError::InvalidParameter(format!(
            "day {} does not exist in a {}-day trip",
            through_index + 1,
            trip.days.len()
        )));
    }

    let mut updated = trip.days.clone();
    let origin_km = updated[0].start_km;
    for day in updated[..=through_index].iter_mut() {
        day.target_km = day.ridden_km();
    }
    let completed_km: f64 = updated[..=through_index]
        .iter()
        .map(|day| day.target_km)
        .sum();

    let after = through_index + 1;
    if completed_km >= trip.total_distance_km - KM_EPSILON {
        for day in updated[after..]
            .iter_mut()
            .filter(|day| day.status == DayStatus::Planned)
        {
            day.status = DayStatus::Skipped;
            day.target_km = 0.0;
            day.notes = Some(FINISHED_AHEAD_NOTE.to_string());
        }
        recompute_boundaries(&mut updated, 0, origin_km);
        debug!(trip_id = trip.id, completed_km, "route finished ahead of schedule");
        return Ok(updated);
    }

    let riding_days = updated[after..]
        .iter()
        .filter(|day| !day.status.is_terminal())
        .count();
    if riding_days > 0 {
        let per_day = (trip.total_distance_km - completed_km) / riding_days as f64;
        for day in updated[after..]
            .iter_mut()
            .filter(|day| !day.status.is_terminal())
        {
            day.target_km = per_day;
        }
        debug!(
            trip_id = trip.id,
            completed_km,
            per_day,
            riding_days,
            "redistributed remaining distance"
        );
    }
    recompute_boundaries(&mut updated, 0, origin_km);
    Ok(updated)
}

pub fn start_day(days: &[DayPlan], day_id: Uuid) -> Result<Vec<DayPlan>, AppError> {
    transition(days, day_id, DayStatus::InProgress)
}

/// Records the ridden distance and closes the day, passing through
/// `in_progress` when the day had not been started yet.
pub fn complete_day(
    days: &[DayPlan],
    day_id: Uuid,
    actual_km: f64,
) -> Result<Vec<DayPlan>, AppError> {
    if !actual_km.is_finite() || actual_km < 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "ridden distance cannot be negative, got {actual_km}"
        )));
    }
    let idx = find_day(days, day_id)?;
    let started = if days[idx].status == DayStatus::Planned {
        start_day(days, day_id)?
    } else {
        days.to_vec()
    };
    let mut updated = transition(&started, day_id, DayStatus::Completed)?;
    updated[idx].actual_km = Some(actual_km);
    Ok(updated)
}

pub fn skip_day(days: &[DayPlan], day_id: Uuid) -> Result<Vec<DayPlan>, AppError> {
    transition(days, day_id, DayStatus::Skipped)
}

pub fn set_day_notes(
    days: &[DayPlan],
    day_id: Uuid,
    notes: Option<String>,
) -> Result<Vec<DayPlan>, AppError> {
    let idx = find_day(days, day_id)?;
    let mut updated = days.to_vec();
    updated[idx].notes = notes.filter(|text| !text.trim().is_empty());
    Ok(updated)
}

/// Status implied by the day list. `paused` is only ever set by the user and
/// is kept until the trip is finished.
pub fn derive_trip_status(current: TripStatus, days: &[DayPlan]) -> TripStatus {
    if !days.is_empty() && days.iter().all(|day| day.status.is_terminal()) {
        return TripStatus::Completed;
    }
    let any_completed = days.iter().any(|day| day.status == DayStatus::Completed);
    match current {
        TripStatus::Planning if any_completed => TripStatus::Active,
        TripStatus::Completed => {
            if any_completed {
                TripStatus::Active
            } else {
                TripStatus::Planning
            }
        }
        other => other,
    }
}

fn transition(days: &[DayPlan], day_id: Uuid, next: DayStatus) -> Result<Vec<DayPlan>, AppError> {
    let idx = find_day(days, day_id)?;
    let current = days[idx].status;
    if !current.can_transition_to(next) {
        return Err(AppError::InvalidOperation(format!(
            "day {} is {} and cannot become {}",
            idx + 1,
            current.as_str(),
            next.as_str()
        )));
    }
    let mut updated = days.to_vec();
    updated[idx].status = next;
    Ok(updated)
}

fn find_day(days: &[DayPlan], day_id: Uuid) -> Result<usize, AppError> {
    days.iter()
        .position(|day| day.id == day_id)
        .ok_or_else(|| AppError::NotFound(format!("day id {day_id}")))
}

fn next_date(date: NaiveDate) -> Result<NaiveDate, AppError> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::InvalidParameter(format!("no calendar day after {date}")))
}

/// Restores contiguity from `from` onwards. `origin_km` is only used when
/// `from` is the first day, which has no predecessor to chain from.
fn recompute_boundaries(days: &mut [DayPlan], from: usize, origin_km: f64) {
    for idx in from..days.len() {
        days[idx].start_km = if idx == 0 {
            origin_km
        } else {
            days[idx - 1].end_km()
        };
        sync_segment(&mut days[idx]);
    }
}

fn sync_segment(day: &mut DayPlan) {
    let (start_km, end_km) = (day.start_km, day.end_km());
    if let Some(segment) = day.segment.as_mut() {
        segment.start_km = start_km;
        segment.end_km = end_km;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{split_route, Route, RoutePoint, RouteSource};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).expect("date")
    }

    fn route(total_km: f64) -> Route {
        Route::new(
            RouteSource::EuroVelo {
                id: 6,
                variant: None,
            },
            vec![
                RoutePoint { lat: 47.0, lon: 7.0, distance_km: 0.0 },
                RoutePoint { lat: 47.5, lon: 8.0, distance_km: total_km / 2.0 },
                RoutePoint { lat: 48.0, lon: 9.0, distance_km: total_km },
            ],
            total_km,
        )
        .expect("route")
    }

    fn schedule(total_km: f64, daily_km: f64) -> Vec<DayPlan> {
        split_route(&route(total_km), daily_km, date(1)).expect("split")
    }

    fn trip(days: Vec<DayPlan>, total_km: f64) -> TripPlan {
        TripPlan {
            id: 1,
            name: "Danube".to_string(),
            route_source: RouteSource::EuroVelo {
                id: 6,
                variant: None,
            },
            daily_distance_km: 100.0,
            total_distance_km: total_km,
            status: TripStatus::Planning,
            budget: None,
            days,
        }
    }

    fn assert_contiguous(days: &[DayPlan]) {
        for pair in days.windows(2) {
            assert!(
                (pair[1].start_km - pair[0].end_km()).abs() < 1e-9,
                "gap between {} and {}",
                pair[0].date,
                pair[1].date
            );
            assert!(pair[0].date < pair[1].date, "dates out of order");
        }
        for day in days {
            if let Some(segment) = day.segment {
                assert_eq!(segment.start_km, day.start_km);
                assert_eq!(segment.end_km, day.end_km());
            }
        }
    }

    #[test]
    fn distance_change_shifts_later_days_but_keeps_their_targets() {
        let days = schedule(400.0, 100.0);
        let updated = update_day_distance(&days, days[1].id, 130.0).expect("update");
        let bounds: Vec<(f64, f64)> = updated.iter().map(|d| (d.start_km, d.target_km)).collect();
        assert_eq!(
            bounds,
            vec![(0.0, 100.0), (100.0, 130.0), (230.0, 100.0), (330.0, 100.0)]
        );
        assert_contiguous(&updated);
        assert_eq!(days[1].target_km, 100.0, "input must not be mutated");
    }

    #[test]
    fn distance_change_rejects_negative_values() {
        let days = schedule(200.0, 100.0);
        let err = update_day_distance(&days, days[0].id, -1.0).unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }

    #[test]
    fn unknown_day_is_not_found() {
        let days = schedule(200.0, 100.0);
        let err = update_day_distance(&days, Uuid::new_v4(), 10.0).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn date_change_rejects_dates_used_by_other_days() {
        let days = schedule(300.0, 100.0);
        let before = days.clone();
        let err = update_day_date(&days, days[0].id, days[2].date).unwrap_err();
        match err {
            AppError::Conflict(message) => assert!(message.contains("day 3")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(days, before);
    }

    #[test]
    fn date_change_resorts_and_rechains_from_first_day() {
        let days = schedule(250.0, 100.0);
        let moved_id = days[0].id;
        let updated = update_day_date(&days, moved_id, date(10)).expect("update");
        assert_eq!(updated.last().expect("last").id, moved_id);
        let bounds: Vec<(f64, f64)> = updated.iter().map(|d| (d.start_km, d.target_km)).collect();
        assert_eq!(bounds, vec![(0.0, 100.0), (100.0, 50.0), (150.0, 100.0)]);
        assert_contiguous(&updated);
    }

    #[test]
    fn date_change_to_own_date_is_allowed() {
        let days = schedule(200.0, 100.0);
        let updated = update_day_date(&days, days[1].id, days[1].date).expect("update");
        assert_eq!(updated, days);
    }

    #[test]
    fn rest_day_after_day_two_of_250_km_trip() {
        let days = schedule(250.0, 100.0);
        let updated = insert_rest_day(&days, days[1].id).expect("insert");
        assert_eq!(updated.len(), 4);
        let rest = &updated[2];
        assert_eq!(rest.target_km, 0.0);
        assert_eq!(rest.status, DayStatus::Skipped);
        assert!(rest.is_rest_day());
        assert_eq!(rest.date, date(3));
        assert_eq!(updated[3].id, days[2].id);
        assert_eq!(updated[3].date, date(4));
        assert_eq!(updated[3].start_km, 200.0);
        assert_eq!(updated[3].target_km, 50.0);
        assert_contiguous(&updated);
    }

    #[test]
    fn rest_day_after_last_day_extends_schedule() {
        let days = schedule(200.0, 100.0);
        let updated = insert_rest_day(&days, days[1].id).expect("insert");
        assert_eq!(updated.len(), 3);
        assert_eq!(updated[2].date, date(3));
        assert_eq!(updated[2].start_km, 200.0);
    }

    #[test]
    fn removing_only_day_is_rejected() {
        let days = schedule(80.0, 100.0);
        assert_eq!(days.len(), 1);
        let err = remove_day(&days, days[0].id).unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
        assert_eq!(days.len(), 1);
    }

    #[test]
    fn removing_unknown_day_reports_not_found_even_on_single_day_trip() {
        let days = schedule(80.0, 100.0);
        let err = remove_day(&days, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn removing_middle_day_rechains_from_predecessor() {
        let days = schedule(300.0, 100.0);
        let updated = remove_day(&days, days[1].id).expect("remove");
        let bounds: Vec<(f64, f64)> = updated.iter().map(|d| (d.start_km, d.target_km)).collect();
        assert_eq!(bounds, vec![(0.0, 100.0), (100.0, 100.0)]);
        assert_contiguous(&updated);
    }

    #[test]
    fn removing_first_day_keeps_route_origin() {
        let days = schedule(300.0, 100.0);
        let updated = remove_day(&days, days[0].id).expect("remove");
        assert_eq!(updated[0].start_km, 0.0);
        assert_contiguous(&updated);
    }

    #[test]
    fn edit_sequences_keep_schedule_contiguous() {
        let mut days = schedule(730.0, 90.0);
        days = update_day_distance(&days, days[2].id, 12.5).expect("distance");
        days = insert_rest_day(&days, days[0].id).expect("rest");
        days = remove_day(&days, days[4].id).expect("remove");
        days = update_day_date(&days, days[3].id, date(28)).expect("date");
        days = insert_rest_day(&days, days[5].id).expect("rest");
        days = update_day_distance(&days, days[0].id, 0.0).expect("distance");
        assert_contiguous(&days);
        let mut dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        dates.dedup();
        assert_eq!(dates.len(), days.len());
    }

    #[test]
    fn adjust_spreads_shortfall_over_remaining_days() {
        let mut days = schedule(400.0, 100.0);
        days = complete_day(&days, days[0].id, 70.0).expect("complete");
        let updated = adjust_remaining_after_completion(&trip(days, 400.0), 0).expect("adjust");
        let bounds: Vec<(f64, f64)> = updated.iter().map(|d| (d.start_km, d.target_km)).collect();
        assert_eq!(bounds[0], (0.0, 70.0));
        assert_eq!(bounds[1], (70.0, 110.0));
        assert_eq!(bounds[2], (180.0, 110.0));
        assert_eq!(bounds[3], (290.0, 110.0));
        let planned: f64 = updated[1..].iter().map(|d| d.target_km).sum();
        assert!((planned - 330.0).abs() < 1e-9);
        assert_contiguous(&updated);
    }

    #[test]
    fn adjusted_layout_survives_a_later_date_move() {
        let mut days = schedule(400.0, 100.0);
        days = complete_day(&days, days[0].id, 70.0).expect("complete");
        let adjusted = adjust_remaining_after_completion(&trip(days, 400.0), 0).expect("adjust");
        let last = adjusted[3].id;
        let moved = update_day_date(&adjusted, last, date(9)).expect("move");
        assert_contiguous(&moved);
        let starts: Vec<f64> = moved.iter().map(|d| d.start_km).collect();
        assert_eq!(starts, vec![0.0, 70.0, 180.0, 290.0]);
        assert!((moved[3].end_km() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn finishing_early_leaves_started_days_alone() {
        let mut days = schedule(300.0, 100.0);
        days = complete_day(&days, days[0].id, 300.0).expect("complete");
        days = start_day(&days, days[1].id).expect("start");
        let updated = adjust_remaining_after_completion(&trip(days, 300.0), 0).expect("adjust");
        assert_eq!(updated[1].status, DayStatus::InProgress);
        assert_eq!(updated[2].status, DayStatus::Skipped);
        assert_eq!(updated[2].target_km, 0.0);
        assert_eq!(updated[2].notes.as_deref(), Some(FINISHED_AHEAD_NOTE));
        assert_contiguous(&updated);
    }

    #[test]
    fn adjust_skips_remaining_days_once_route_is_covered() {
        let mut days = schedule(300.0, 100.0);
        days = complete_day(&days, days[0].id, 180.0).expect("complete");
        days = complete_day(&days, days[1].id, 130.0).expect("complete");
        let updated = adjust_remaining_after_completion(&trip(days, 300.0), 1).expect("adjust");
        assert_eq!(updated[2].status, DayStatus::Skipped);
        assert_eq!(updated[2].notes.as_deref(), Some(FINISHED_AHEAD_NOTE));
        assert_eq!(derive_trip_status(TripStatus::Active, &updated), TripStatus::Completed);
    }

    #[test]
    fn adjust_leaves_rest_days_at_zero() {
        let mut days = schedule(300.0, 100.0);
        days = insert_rest_day(&days, days[1].id).expect("rest");
        days = complete_day(&days, days[0].id, 50.0).expect("complete");
        let updated = adjust_remaining_after_completion(&trip(days, 300.0), 0).expect("adjust");
        assert_eq!(updated[1].target_km, 125.0);
        assert_eq!(updated[2].target_km, 0.0);
        assert_eq!(updated[3].target_km, 125.0);
        assert_eq!(updated[3].start_km, 175.0);
    }

    #[test]
    fn adjust_rejects_out_of_range_index() {
        let days = schedule(200.0, 100.0);
        let err = adjust_remaining_after_completion(&trip(days, 200.0), 5).unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }

    #[test]
    fn completing_sets_actual_and_blocks_further_changes() {
        let days = schedule(200.0, 100.0);
        let updated = complete_day(&days, days[0].id, 96.4).expect("complete");
        assert_eq!(updated[0].status, DayStatus::Completed);
        assert_eq!(updated[0].actual_km, Some(96.4));
        assert!(matches!(
            skip_day(&updated, days[0].id),
            Err(AppError::InvalidOperation(_))
        ));
        assert!(matches!(
            complete_day(&updated, days[0].id, 10.0),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn started_day_cannot_be_skipped() {
        let days = schedule(200.0, 100.0);
        let started = start_day(&days, days[1].id).expect("start");
        assert_eq!(started[1].status, DayStatus::InProgress);
        assert!(skip_day(&started, days[1].id).is_err());
    }

    #[test]
    fn trip_status_follows_day_statuses() {
        let days = schedule(200.0, 100.0);
        assert_eq!(derive_trip_status(TripStatus::Planning, &days), TripStatus::Planning);
        let one = complete_day(&days, days[0].id, 100.0).expect("complete");
        assert_eq!(derive_trip_status(TripStatus::Planning, &one), TripStatus::Active);
        assert_eq!(derive_trip_status(TripStatus::Paused, &one), TripStatus::Paused);
        let all = skip_day(&one, days[1].id).expect("skip");
        assert_eq!(derive_trip_status(TripStatus::Paused, &all), TripStatus::Completed);
    }

    #[test]
    fn blank_notes_are_cleared() {
        let days = schedule(200.0, 100.0);
        let noted = set_day_notes(&days, days[0].id, Some("Ferry at 9".to_string())).expect("note");
        assert_eq!(noted[0].notes.as_deref(), Some("Ferry at 9"));
        let cleared = set_day_notes(&noted, days[0].id, Some("  ".to_string())).expect("note");
        assert_eq!(cleared[0].notes, None);
    }
}
