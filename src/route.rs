use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{DayPlan, DayStatus};

/// Slack used when comparing accumulated kilometre values.
pub const KM_EPSILON: f64 = 1e-9;

/// Longest schedule a split may produce, roughly a century of riding days.
pub const MAX_TRIP_DAYS: usize = 36_600;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSource {
    EuroVelo {
        id: u32,
        #[serde(default)]
        variant: Option<String>,
    },
    Custom {
        route_id: String,
    },
    Imported {
        name: String,
    },
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EuroVelo {
                id,
                variant: Some(variant),
            } => write!(f, "EuroVelo {id} ({variant})"),
            Self::EuroVelo { id, variant: None } => write!(f, "EuroVelo {id}"),
            Self::Custom { route_id } => write!(f, "custom route {route_id}"),
            Self::Imported { name } => write!(f, "imported {name}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lon: f64,
    /// Cumulative distance from the start of the route.
    pub distance_km: f64,
}

impl RoutePoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// The stretch of route ridden on one day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start_km: f64,
    pub end_km: f64,
    pub start: Coordinate,
    pub end: Coordinate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub source: RouteSource,
    pub points: Vec<RoutePoint>,
    pub total_distance_km: f64,
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    source: RouteSource,
    #[serde(default)]
    points: Vec<RoutePoint>,
    total_distance_km: Option<f64>,
}

impl Route {
    pub fn new(
        source: RouteSource,
        points: Vec<RoutePoint>,
        total_distance_km: f64,
    ) -> Result<Self, AppError> {
        if !total_distance_km.is_finite() || total_distance_km < 0.0 {
            return Err(AppError::InvalidParameter(format!(
                "route total distance must be a non-negative number, got {total_distance_km}"
            )));
        }
        let mut previous = 0.0;
        for (idx, point) in points.iter().enumerate() {
            if !point.distance_km.is_finite() || point.distance_km < previous {
                return Err(AppError::InvalidParameter(format!(
                    "route point {} has distance {} km, expected at least {previous} km",
                    idx + 1,
                    point.distance_km
                )));
            }
            previous = point.distance_km;
        }
        Ok(Self {
            source,
            points,
            total_distance_km,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let file: RouteFile = serde_json::from_str(raw)?;
        let total = match file.total_distance_km {
            Some(total) => total,
            None => file
                .points
                .last()
                .map(|point| point.distance_km)
                .unwrap_or(0.0),
        };
        Self::new(file.source, file.points, total)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// First point at or just past `distance_km`, falling back to the final point.
    fn point_at_or_after(&self, distance_km: f64) -> Option<&RoutePoint> {
        let idx = self
            .points
            .partition_point(|point| point.distance_km < distance_km - KM_EPSILON);
        self.points.get(idx).or_else(|| self.points.last())
    }

    pub fn segment(&self, start_km: f64, end_km: f64) -> Option<RouteSegment> {
        let start = self.point_at_or_after(start_km)?;
        let end = self.point_at_or_after(end_km)?;
        Some(RouteSegment {
            start_km,
            end_km,
            start: start.coordinate(),
            end: end.coordinate(),
        })
    }
}

/// Splits a route into consecutive riding days of `daily_distance_km`,
/// the last one taking whatever distance is left.
pub fn split_route(
    route: &Route,
    daily_distance_km: f64,
    start_date: NaiveDate,
) -> Result<Vec<DayPlan>, AppError> {
    if !daily_distance_km.is_finite() || daily_distance_km <= 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "daily distance must be greater than 0 km, got {daily_distance_km}"
        )));
    }
    let total = route.total_distance_km;
    if route.points.is_empty() && total > 0.0 {
        return Err(AppError::InvalidParameter(
            "route has no points but a non-zero total distance".to_string(),
        ));
    }

    let day_count = day_count(total, daily_distance_km)?;
    let calendar_days = NaiveDate::MAX.signed_duration_since(start_date).num_days() + 1;
    if i64::try_from(day_count).map_or(true, |count| count > calendar_days) {
        return Err(AppError::InvalidParameter(format!(
            "{day_count} days starting {start_date} run past the end of the calendar"
        )));
    }
    let mut days = Vec::new();
    for idx in 0..day_count {
        let start_km = idx as f64 * daily_distance_km;
        let target_km = if idx + 1 == day_count {
            total - start_km
        } else {
            daily_distance_km
        };
        let end_km = start_km + target_km;
        let date = start_date
            .checked_add_days(Days::new(idx as u64))
            .ok_or_else(|| {
                AppError::InvalidParameter(format!("day {} falls outside the calendar", idx + 1))
            })?;
        days.push(DayPlan {
            id: Uuid::new_v4(),
            date,
            start_km,
            target_km,
            actual_km: None,
            status: DayStatus::Planned,
            segment: route.segment(start_km, end_km),
            notes: None,
        });
    }

    debug!(
        total_km = total,
        daily_km = daily_distance_km,
        days = days.len(),
        "split route into days"
    );
    Ok(days)
}

fn day_count(total_km: f64, daily_distance_km: f64) -> Result<usize, AppError> {
    if total_km <= KM_EPSILON {
        return Ok(0);
    }
    let ratio = (total_km / daily_distance_km).ceil();
    if !ratio.is_finite() || ratio > MAX_TRIP_DAYS as f64 {
        return Err(AppError::InvalidParameter(format!(
            "{daily_distance_km} km per day over {total_km} km needs more than {MAX_TRIP_DAYS} days"
        )));
    }
    let mut count = ratio as usize;
    // 300 / 100.000000001 style ratios must not produce a sliver day.
    while count > 1 && (count - 1) as f64 * daily_distance_km >= total_km - KM_EPSILON {
        count -= 1;
    }
    Ok(count.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
    }

    fn straight_route(total_km: f64, step_km: f64) -> Route {
        let mut points = Vec::new();
        let mut km = 0.0;
        while km < total_km {
            points.push(RoutePoint {
                lat: 45.0 + km / 100.0,
                lon: 5.0,
                distance_km: km,
            });
            km += step_km;
        }
        points.push(RoutePoint {
            lat: 45.0 + total_km / 100.0,
            lon: 5.0,
            distance_km: total_km,
        });
        Route::new(
            RouteSource::EuroVelo {
                id: 6,
                variant: Some("main".to_string()),
            },
            points,
            total_km,
        )
        .expect("route")
    }

    #[test]
    fn splits_250_km_into_three_days_with_short_last_day() {
        let days = split_route(&straight_route(250.0, 10.0), 100.0, start()).expect("split");
        let bounds: Vec<(f64, f64)> = days.iter().map(|d| (d.start_km, d.end_km())).collect();
        assert_eq!(bounds, vec![(0.0, 100.0), (100.0, 200.0), (200.0, 250.0)]);
        assert_eq!(days[2].target_km, 50.0);
        assert_eq!(days[0].date, start());
        assert_eq!(days[2].date, NaiveDate::from_ymd_opt(2024, 6, 3).expect("date"));
        assert!(days
            .iter()
            .all(|d| d.status == DayStatus::Planned && d.actual_km.is_none()));
    }

    #[test]
    fn day_count_and_total_hold_for_many_ratios() {
        for (total, daily) in [
            (250.0, 100.0),
            (300.0, 100.0),
            (0.3, 0.1),
            (1234.5, 87.3),
            (42.0, 500.0),
            (1000.0, 33.333),
        ] {
            let days = split_route(&straight_route(total, 7.0), daily, start()).expect("split");
            let expected = (total / daily - 1e-9).ceil() as usize;
            assert_eq!(days.len(), expected, "total {total} daily {daily}");
            let sum: f64 = days.iter().map(|d| d.target_km).sum();
            assert!((sum - total).abs() < 1e-6, "sum {sum} vs {total}");
            for day in &days[..days.len() - 1] {
                assert!((day.target_km - daily).abs() < 1e-9);
            }
            let last = days.last().expect("last day");
            assert!(last.target_km > 0.0 && last.target_km <= daily + 1e-9);
        }
    }

    #[test]
    fn segment_endpoints_use_point_at_or_past_boundary() {
        let route = Route::new(
            RouteSource::Custom {
                route_id: "alps".to_string(),
            },
            vec![
                RoutePoint { lat: 1.0, lon: 1.0, distance_km: 0.0 },
                RoutePoint { lat: 2.0, lon: 2.0, distance_km: 40.0 },
                RoutePoint { lat: 3.0, lon: 3.0, distance_km: 110.0 },
                RoutePoint { lat: 4.0, lon: 4.0, distance_km: 140.0 },
            ],
            150.0,
        )
        .expect("route");
        let days = split_route(&route, 100.0, start()).expect("split");
        let first = days[0].segment.expect("segment");
        assert_eq!(first.start, Coordinate { lat: 1.0, lon: 1.0 });
        assert_eq!(first.end, Coordinate { lat: 3.0, lon: 3.0 });
        let second = days[1].segment.expect("segment");
        assert_eq!(second.start_km, 100.0);
        assert_eq!(second.end_km, 150.0);
        assert_eq!(second.end, Coordinate { lat: 4.0, lon: 4.0 });
    }

    #[test]
    fn rejects_non_positive_daily_distance() {
        let route = straight_route(100.0, 10.0);
        for daily in [0.0, -5.0, f64::NAN] {
            match split_route(&route, daily, start()) {
                Err(AppError::InvalidParameter(message)) => {
                    assert!(message.contains("daily distance"))
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_vanishing_daily_distance() {
        let route = straight_route(1000.0, 100.0);
        for daily in [1e-15, f64::MIN_POSITIVE] {
            let err = split_route(&route, daily, start()).unwrap_err();
            assert!(matches!(err, AppError::InvalidParameter(_)));
        }
    }

    #[test]
    fn rejects_schedule_running_past_the_calendar() {
        let route = straight_route(1000.0, 100.0);
        let late = NaiveDate::MAX.pred_opt().expect("date");
        let err = split_route(&route, 100.0, late).unwrap_err();
        match err {
            AppError::InvalidParameter(message) => assert!(message.contains("calendar")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_route_with_distance() {
        let route = Route::new(
            RouteSource::Imported {
                name: "empty.gpx".to_string(),
            },
            Vec::new(),
            12.0,
        )
        .expect("route");
        assert!(matches!(
            split_route(&route, 10.0, start()),
            Err(AppError::InvalidParameter(_))
        ));
    }

    #[test]
    fn zero_length_route_yields_no_days() {
        let route = Route::new(
            RouteSource::Imported {
                name: "nowhere.gpx".to_string(),
            },
            Vec::new(),
            0.0,
        )
        .expect("route");
        assert!(split_route(&route, 10.0, start()).expect("split").is_empty());
    }

    #[test]
    fn rejects_points_that_go_backwards() {
        let err = Route::new(
            RouteSource::Custom {
                route_id: "loop".to_string(),
            },
            vec![
                RoutePoint { lat: 0.0, lon: 0.0, distance_km: 0.0 },
                RoutePoint { lat: 0.0, lon: 0.1, distance_km: 12.0 },
                RoutePoint { lat: 0.0, lon: 0.2, distance_km: 11.0 },
            ],
            12.0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("route point 3"));
    }

    #[test]
    fn parses_route_file_and_defaults_total_to_last_point() {
        let raw = r#"{
            "source": {"kind": "euro_velo", "id": 15, "variant": "rhine"},
            "points": [
                {"lat": 46.6, "lon": 8.6, "distance_km": 0.0},
                {"lat": 47.5, "lon": 7.6, "distance_km": 182.5}
            ]
        }"#;
        let route = Route::from_json_str(raw).expect("parse");
        assert_eq!(route.total_distance_km, 182.5);
        assert_eq!(route.source.to_string(), "EuroVelo 15 (rhine)");
    }
}
