use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entities::{day_plan, expense, trip};
use crate::error::AppError;
use crate::expenses::{budget_status_for, get_expense_summary, sort_expenses, BudgetStatus, ExpenseSummary};
use crate::model::{
    Budget, DayPlan, DayStatus, Expense, ExpenseChanges, ExpenseInput, ExpenseQuery, TripChanges,
    TripInput, TripPlan, TripStatus,
};
use crate::progress::{calculate_trip_stats, TripStats};
use crate::route::{split_route, Coordinate, RouteSegment};
use crate::schedule;

/// Owns the store connection. Every schedule edit loads the trip, runs the
/// matching pure operation and writes the result in one transaction.
pub struct App {
    db: DatabaseConnection,
}

impl App {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_trip(&self, input: TripInput) -> Result<TripPlan, AppError> {
        ensure_non_empty("trip name", &input.name)?;
        if let Some(budget) = &input.budget {
            ensure_budget(budget)?;
        }
        let days = split_route(&input.route, input.daily_distance_km, input.start_date)?;
        let route_source = serde_json::to_string(&input.route.source)?;

        let txn = self.db.begin().await?;
        let result: Result<TripPlan, AppError> = async {
            let now = Utc::now();
            let active = trip::ActiveModel {
                name: Set(input.name.trim().to_string()),
                route_source: Set(route_source),
                daily_distance_km: Set(input.daily_distance_km),
                total_distance_km: Set(input.route.total_distance_km),
                status: Set(TripStatus::Planning.as_str().to_string()),
                budget_amount: Set(input.budget.as_ref().map(|budget| budget.amount)),
                budget_currency: Set(input.budget.as_ref().map(|budget| budget.currency.clone())),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let insert = trip::Entity::insert(active).exec(&txn).await?;
            let trip_id = insert.last_insert_id;
            insert_days_with_conn(&txn, trip_id, &days).await?;
            load_trip_with_conn(&txn, trip_id).await
        }
        .await;

        let trip = finalize_transaction(txn, result).await?;
        info!(
            trip_id = trip.id,
            days = trip.days.len(),
            total_km = trip.total_distance_km,
            "created trip"
        );
        Ok(trip)
    }

    pub async fn get_trip(&self, id: i64) -> Result<TripPlan, AppError> {
        load_trip_with_conn(&self.db, id).await
    }

    pub async fn list_trips(&self) -> Result<Vec<TripPlan>, AppError> {
        let trips = trip::Entity::find()
            .order_by_asc(trip::Column::Id)
            .all(&self.db)
            .await?;
        if trips.is_empty() {
            return Ok(Vec::new());
        }
        let trip_ids: Vec<i64> = trips.iter().map(|trip| trip.id).collect();
        let days = day_plan::Entity::find()
            .filter(day_plan::Column::TripId.is_in(trip_ids))
            .order_by_asc(day_plan::Column::TripId)
            .order_by_asc(day_plan::Column::SortOrder)
            .all(&self.db)
            .await?;

        let mut days_by_trip: HashMap<i64, Vec<day_plan::Model>> = HashMap::new();
        for day in days {
            days_by_trip.entry(day.trip_id).or_default().push(day);
        }

        trips
            .into_iter()
            .map(|trip| {
                let days = days_by_trip.remove(&trip.id).unwrap_or_default();
                trip_from_models(trip, days)
            })
            .collect()
    }

    pub async fn trip_stats(&self, id: i64) -> Result<(TripPlan, TripStats), AppError> {
        let trip = self.get_trip(id).await?;
        let stats = calculate_trip_stats(&trip);
        Ok((trip, stats))
    }

    pub async fn update_trip(&self, id: i64, changes: TripChanges) -> Result<TripPlan, AppError> {
        let txn = self.db.begin().await?;
        let result = self.update_trip_with_conn(&txn, id, changes).await;
        finalize_transaction(txn, result).await
    }

    async fn update_trip_with_conn<C: ConnectionTrait>(
        &self,
        db: &C,
        id: i64,
        changes: TripChanges,
    ) -> Result<TripPlan, AppError> {
        let current = load_trip_with_conn(db, id).await?;
        if let Some(name) = changes.name.as_deref() {
            ensure_non_empty("trip name", name)?;
        }
        if let Some(daily) = changes.daily_distance_km {
            if !daily.is_finite() || daily <= 0.0 {
                return Err(AppError::InvalidParameter(format!(
                    "daily distance must be greater than 0 km, got {daily}"
                )));
            }
        }
        if let Some(budget) = &changes.budget {
            ensure_budget(budget)?;
        }

        let mut active = trip::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(daily) = changes.daily_distance_km {
            active.daily_distance_km = Set(daily);
        }
        if let Some(status) = changes.status {
            let next = explicit_status_change(&current, status)?;
            active.status = Set(next.as_str().to_string());
        }
        if changes.clear_budget {
            active.budget_amount = Set(None);
            active.budget_currency = Set(None);
        } else if let Some(budget) = changes.budget {
            active.budget_amount = Set(Some(budget.amount));
            active.budget_currency = Set(Some(budget.currency));
        }
        active.updated_at = Set(Utc::now());

        match active.update(db).await {
            Ok(_) => {}
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                return Err(AppError::NotFound(format!("trip id {id}")));
            }
            Err(err) => return Err(err.into()),
        }
        info!(trip_id = id, "updated trip");
        load_trip_with_conn(db, id).await
    }

    pub async fn delete_trip(&self, id: i64) -> Result<(), AppError> {
        let txn = self.db.begin().await?;
        expense::Entity::delete_many()
            .filter(expense::Column::TripId.eq(id))
            .exec(&txn)
            .await?;
        day_plan::Entity::delete_many()
            .filter(day_plan::Column::TripId.eq(id))
            .exec(&txn)
            .await?;

        let result = trip::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!("trip id {id}")));
        }
        txn.commit().await?;
        info!(trip_id = id, "deleted trip");
        Ok(())
    }

    pub async fn update_day_distance(
        &self,
        trip_id: i64,
        day_id: Uuid,
        new_target_km: f64,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "update_day_distance", |trip| {
            schedule::update_day_distance(&trip.days, day_id, new_target_km)
        })
        .await
    }

    pub async fn update_day_date(
        &self,
        trip_id: i64,
        day_id: Uuid,
        new_date: chrono::NaiveDate,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "update_day_date", |trip| {
            schedule::update_day_date(&trip.days, day_id, new_date)
        })
        .await
    }

    pub async fn insert_rest_day(
        &self,
        trip_id: i64,
        after_day_id: Uuid,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "insert_rest_day", |trip| {
            schedule::insert_rest_day(&trip.days, after_day_id)
        })
        .await
    }

    pub async fn remove_day(&self, trip_id: i64, day_id: Uuid) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "remove_day", |trip| {
            schedule::remove_day(&trip.days, day_id)
        })
        .await
    }

    pub async fn start_day(&self, trip_id: i64, day_id: Uuid) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "start_day", |trip| {
            schedule::start_day(&trip.days, day_id)
        })
        .await
    }

    /// `actual_km` defaults to the day's planned distance.
    pub async fn complete_day(
        &self,
        trip_id: i64,
        day_id: Uuid,
        actual_km: Option<f64>,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "complete_day", |trip| {
            let planned = trip
                .day_index(day_id)
                .map(|idx| trip.days[idx].target_km)
                .ok_or_else(|| AppError::NotFound(format!("day id {day_id}")))?;
            schedule::complete_day(&trip.days, day_id, actual_km.unwrap_or(planned))
        })
        .await
    }

    pub async fn skip_day(&self, trip_id: i64, day_id: Uuid) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "skip_day", |trip| {
            schedule::skip_day(&trip.days, day_id)
        })
        .await
    }

    pub async fn set_day_notes(
        &self,
        trip_id: i64,
        day_id: Uuid,
        notes: Option<String>,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "set_day_notes", |trip| {
            schedule::set_day_notes(&trip.days, day_id, notes)
        })
        .await
    }

    pub async fn adjust_remaining(
        &self,
        trip_id: i64,
        through_index: usize,
    ) -> Result<TripPlan, AppError> {
        self.edit_schedule(trip_id, "adjust_remaining", |trip| {
            schedule::adjust_remaining_after_completion(trip, through_index)
        })
        .await
    }

    async fn edit_schedule<F>(
        &self,
        trip_id: i64,
        action: &'static str,
        edit: F,
    ) -> Result<TripPlan, AppError>
    where
        F: FnOnce(&TripPlan) -> Result<Vec<DayPlan>, AppError>,
    {
        let txn = self.db.begin().await?;
        let result = self
            .apply_edit_with_conn(&txn, trip_id, action, edit)
            .await;
        finalize_transaction(txn, result).await
    }

    async fn apply_edit_with_conn<C, F>(
        &self,
        db: &C,
        trip_id: i64,
        action: &'static str,
        edit: F,
    ) -> Result<TripPlan, AppError>
    where
        C: ConnectionTrait,
        F: FnOnce(&TripPlan) -> Result<Vec<DayPlan>, AppError>,
    {
        let mut trip = load_trip_with_conn(db, trip_id).await?;
        let days = match edit(&trip) {
            Ok(days) => days,
            Err(err) => {
                if err.is_rejection() {
                    warn!(trip_id, action, error = %err, "schedule edit rejected");
                } else {
                    error!(trip_id, action, error = %err, "schedule edit failed");
                }
                return Err(err);
            }
        };
        let status = schedule::derive_trip_status(trip.status, &days);

        replace_days_with_conn(db, trip_id, &trip.days, &days).await?;
        let mut active = trip::ActiveModel {
            id: Set(trip_id),
            ..Default::default()
        };
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active.update(db).await?;

        if status != trip.status {
            info!(
                trip_id,
                from = trip.status.as_str(),
                to = status.as_str(),
                "trip status changed"
            );
        }
        trip.days = days;
        trip.status = status;
        info!(trip_id, action, days = trip.days.len(), "schedule updated");
        Ok(trip)
    }

    pub async fn add_expense(
        &self,
        trip_id: i64,
        input: ExpenseInput,
    ) -> Result<Expense, AppError> {
        ensure_amount(input.amount)?;
        ensure_non_empty("expense currency", &input.currency)?;
        let trip = self.get_trip(trip_id).await?;
        if let Some(day_id) = input.day_plan_id {
            ensure_day_in_trip(&trip, day_id)?;
        }

        let now = Utc::now();
        let active = expense::ActiveModel {
            trip_id: Set(trip_id),
            day_plan_id: Set(input.day_plan_id),
            date: Set(input.date),
            amount: Set(input.amount),
            currency: Set(input.currency.trim().to_uppercase()),
            category: Set(input.category.as_str().to_string()),
            description: Set(non_blank(input.description)),
            country: Set(non_blank(input.country)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = expense::Entity::insert(active).exec(&self.db).await?;
        let created = self.get_expense(insert.last_insert_id).await?;
        info!(trip_id, expense_id = created.id, amount = created.amount, "added expense");
        Ok(created)
    }

    pub async fn get_expense(&self, id: i64) -> Result<Expense, AppError> {
        let model = expense::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("expense id {id}")))?;
        expense_from_model(model)
    }

    pub async fn update_expense(
        &self,
        id: i64,
        changes: ExpenseChanges,
    ) -> Result<Expense, AppError> {
        if let Some(amount) = changes.amount {
            ensure_amount(amount)?;
        }
        if let Some(currency) = changes.currency.as_deref() {
            ensure_non_empty("expense currency", currency)?;
        }
        let existing = self.get_expense(id).await?;
        if let Some(day_id) = changes.day_plan_id {
            let trip = self.get_trip(existing.trip_id).await?;
            ensure_day_in_trip(&trip, day_id)?;
        }

        let mut active = expense::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(day_id) = changes.day_plan_id {
            active.day_plan_id = Set(Some(day_id));
        }
        if let Some(date) = changes.date {
            active.date = Set(date);
        }
        if let Some(amount) = changes.amount {
            active.amount = Set(amount);
        }
        if let Some(currency) = changes.currency {
            active.currency = Set(currency.trim().to_uppercase());
        }
        if let Some(category) = changes.category {
            active.category = Set(category.as_str().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(non_blank(Some(description)));
        }
        if let Some(country) = changes.country {
            active.country = Set(non_blank(Some(country)));
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => expense_from_model(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("expense id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_expenses(&self, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let unique_ids = unique_ids(ids);
        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let found = expense::Entity::find()
                .filter(expense::Column::Id.is_in(unique_ids.clone()))
                .all(&txn)
                .await?;
            let existing: HashSet<i64> = found.iter().map(|expense| expense.id).collect();
            let missing: Vec<i64> = unique_ids
                .iter()
                .cloned()
                .filter(|id| !existing.contains(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "expense id(s) not found: {}",
                    join_ids(&missing)
                )));
            }
            let deleted = expense::Entity::delete_many()
                .filter(expense::Column::Id.is_in(unique_ids.clone()))
                .exec(&txn)
                .await?;
            Ok(deleted.rows_affected)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn list_expenses(
        &self,
        trip_id: i64,
        query: &ExpenseQuery,
    ) -> Result<Vec<Expense>, AppError> {
        let trip = self.get_trip(trip_id).await?;
        let mut select = expense::Entity::find().filter(expense::Column::TripId.eq(trip_id));
        if let Some(day_id) = query.day_plan_id {
            ensure_day_in_trip(&trip, day_id)?;
            select = select.filter(expense::Column::DayPlanId.eq(day_id));
        }
        let models = select
            .order_by_asc(expense::Column::Date)
            .order_by_asc(expense::Column::Id)
            .all(&self.db)
            .await?;
        let expenses = models
            .into_iter()
            .map(expense_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match query.sort {
            Some(sort_by) => sort_expenses(&expenses, sort_by),
            None => expenses,
        })
    }

    pub async fn expense_summary(&self, trip_id: i64) -> Result<ExpenseSummary, AppError> {
        let expenses = self.list_expenses(trip_id, &ExpenseQuery::default()).await?;
        Ok(get_expense_summary(&expenses))
    }

    /// `None` when the trip has no budget.
    pub async fn budget_status(&self, trip_id: i64) -> Result<Option<BudgetStatus>, AppError> {
        let trip = self.get_trip(trip_id).await?;
        let Some(budget) = trip.budget else {
            return Ok(None);
        };
        let expenses = self.list_expenses(trip_id, &ExpenseQuery::default()).await?;
        Ok(Some(budget_status_for(&budget, &expenses)))
    }
}

/// `paused` and resuming from it are the only statuses a user sets directly.
fn explicit_status_change(trip: &TripPlan, requested: TripStatus) -> Result<TripStatus, AppError> {
    match requested {
        TripStatus::Paused if trip.status == TripStatus::Completed => Err(
            AppError::InvalidOperation(format!("trip id {} is already completed", trip.id)),
        ),
        TripStatus::Paused => Ok(TripStatus::Paused),
        TripStatus::Active if trip.status == TripStatus::Paused => {
            let ridden = trip
                .days
                .iter()
                .any(|day| day.status == DayStatus::Completed);
            Ok(if ridden {
                TripStatus::Active
            } else {
                TripStatus::Planning
            })
        }
        TripStatus::Active if trip.status == TripStatus::Active => Ok(TripStatus::Active),
        TripStatus::Active => Err(AppError::InvalidOperation(format!(
            "trip id {} is {}; only a paused trip can be resumed",
            trip.id,
            trip.status.as_str()
        ))),
        other => Err(AppError::InvalidParameter(format!(
            "trip status {} is derived from its days and cannot be set",
            other.as_str()
        ))),
    }
}

async fn load_trip_with_conn<C: ConnectionTrait>(db: &C, id: i64) -> Result<TripPlan, AppError> {
    let model = trip::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip id {id}")))?;
    let days = day_plan::Entity::find()
        .filter(day_plan::Column::TripId.eq(id))
        .order_by_asc(day_plan::Column::SortOrder)
        .all(db)
        .await?;
    trip_from_models(model, days)
}

const DAY_INSERT_BATCH: usize = 500;

async fn insert_days_with_conn<C: ConnectionTrait>(
    db: &C,
    trip_id: i64,
    days: &[DayPlan],
) -> Result<(), AppError> {
    let models: Vec<day_plan::ActiveModel> = days
        .iter()
        .enumerate()
        .map(|(idx, day)| day_active_model(trip_id, (idx + 1) as i32, day))
        .collect();
    // Each row binds one variable per column; keep batches under SQLite's limit.
    for chunk in models.chunks(DAY_INSERT_BATCH) {
        day_plan::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Rewrites the trip's day rows. Expenses pointing at days that disappeared
/// keep their amount but lose the day link.
async fn replace_days_with_conn<C: ConnectionTrait>(
    db: &C,
    trip_id: i64,
    previous: &[DayPlan],
    days: &[DayPlan],
) -> Result<(), AppError> {
    let kept: HashSet<Uuid> = days.iter().map(|day| day.id).collect();
    let removed: Vec<Uuid> = previous
        .iter()
        .map(|day| day.id)
        .filter(|id| !kept.contains(id))
        .collect();
    if !removed.is_empty() {
        expense::Entity::update_many()
            .col_expr(expense::Column::DayPlanId, Expr::value(Option::<Uuid>::None))
            .filter(expense::Column::DayPlanId.is_in(removed))
            .exec(db)
            .await?;
    }

    day_plan::Entity::delete_many()
        .filter(day_plan::Column::TripId.eq(trip_id))
        .exec(db)
        .await?;
    insert_days_with_conn(db, trip_id, days).await
}

fn trip_from_models(model: trip::Model, days: Vec<day_plan::Model>) -> Result<TripPlan, AppError> {
    let budget = match (model.budget_amount, model.budget_currency) {
        (Some(amount), Some(currency)) => Some(Budget { amount, currency }),
        _ => None,
    };
    Ok(TripPlan {
        id: model.id,
        name: model.name,
        route_source: serde_json::from_str(&model.route_source)?,
        daily_distance_km: model.daily_distance_km,
        total_distance_km: model.total_distance_km,
        status: model.status.parse()?,
        budget,
        days: days
            .into_iter()
            .map(day_from_model)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn day_from_model(model: day_plan::Model) -> Result<DayPlan, AppError> {
    let segment = match (
        model.segment_start_lat,
        model.segment_start_lon,
        model.segment_end_lat,
        model.segment_end_lon,
    ) {
        (Some(start_lat), Some(start_lon), Some(end_lat), Some(end_lon)) => Some(RouteSegment {
            start_km: model.start_km,
            end_km: model.start_km + model.target_km,
            start: Coordinate {
                lat: start_lat,
                lon: start_lon,
            },
            end: Coordinate {
                lat: end_lat,
                lon: end_lon,
            },
        }),
        _ => None,
    };
    Ok(DayPlan {
        id: model.id,
        date: model.date,
        start_km: model.start_km,
        target_km: model.target_km,
        actual_km: model.actual_km,
        status: model.status.parse()?,
        segment,
        notes: model.notes,
    })
}

fn day_active_model(trip_id: i64, sort_order: i32, day: &DayPlan) -> day_plan::ActiveModel {
    day_plan::ActiveModel {
        id: Set(day.id),
        trip_id: Set(trip_id),
        sort_order: Set(sort_order),
        date: Set(day.date),
        start_km: Set(day.start_km),
        target_km: Set(day.target_km),
        actual_km: Set(day.actual_km),
        status: Set(day.status.as_str().to_string()),
        segment_start_lat: Set(day.segment.map(|segment| segment.start.lat)),
        segment_start_lon: Set(day.segment.map(|segment| segment.start.lon)),
        segment_end_lat: Set(day.segment.map(|segment| segment.end.lat)),
        segment_end_lon: Set(day.segment.map(|segment| segment.end.lon)),
        notes: Set(day.notes.clone()),
    }
}

fn expense_from_model(model: expense::Model) -> Result<Expense, AppError> {
    Ok(Expense {
        id: model.id,
        trip_id: model.trip_id,
        day_plan_id: model.day_plan_id,
        date: model.date,
        amount: model.amount,
        currency: model.currency,
        category: model.category.parse()?,
        description: model.description,
        country: model.country,
    })
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn ensure_day_in_trip(trip: &TripPlan, day_id: Uuid) -> Result<(), AppError> {
    if trip.day_index(day_id).is_none() {
        return Err(AppError::NotFound(format!(
            "day id {day_id} in trip id {}",
            trip.id
        )));
    }
    Ok(())
}

fn ensure_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "expense amount cannot be negative, got {amount}"
        )));
    }
    Ok(())
}

fn ensure_budget(budget: &Budget) -> Result<(), AppError> {
    if !budget.amount.is_finite() || budget.amount < 0.0 {
        return Err(AppError::InvalidParameter(format!(
            "budget cannot be negative, got {}",
            budget.amount
        )));
    }
    ensure_non_empty("budget currency", &budget.currency)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }
    unique
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidParameter(format!("{label} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{ExpenseCategory, SortBy};
    use crate::route::{Route, RoutePoint, RouteSource};
    use chrono::NaiveDate;
    use sea_orm::PaginatorTrait;
    use tempfile::TempDir;

    async fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().expect("temp dir");
        let db_path = db::resolve_db_path(dir.path());
        db::ensure_parent_dir(&db_path).expect("ensure parent");
        let db = db::connect(&db_path).await.expect("connect db");
        db::ensure_schema(&db).await.expect("ensure schema");
        (dir, App::new(db))
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).expect("date")
    }

    fn route(total_km: f64) -> Route {
        Route::new(
            RouteSource::EuroVelo {
                id: 6,
                variant: Some("danube".to_string()),
            },
            vec![
                RoutePoint { lat: 48.2, lon: 16.4, distance_km: 0.0 },
                RoutePoint { lat: 48.1, lon: 17.1, distance_km: total_km / 2.0 },
                RoutePoint { lat: 47.5, lon: 19.0, distance_km: total_km },
            ],
            total_km,
        )
        .expect("route")
    }

    async fn create_trip(app: &App, total_km: f64, daily_km: f64) -> TripPlan {
        app.create_trip(TripInput {
            name: "Danube".to_string(),
            route: route(total_km),
            daily_distance_km: daily_km,
            start_date: date(1),
            budget: Some(Budget {
                amount: 100.0,
                currency: "EUR".to_string(),
            }),
        })
        .await
        .expect("create trip")
    }

    fn expense_input(amount: f64, category: ExpenseCategory) -> ExpenseInput {
        ExpenseInput {
            day_plan_id: None,
            date: date(1),
            amount,
            currency: "eur".to_string(),
            category,
            description: None,
            country: None,
        }
    }

    #[tokio::test]
    async fn create_trip_persists_split_schedule() {
        let (_dir, app) = setup_app().await;
        let created = create_trip(&app, 250.0, 100.0).await;
        assert_eq!(created.days.len(), 3);
        assert_eq!(created.status, TripStatus::Planning);

        let loaded = app.get_trip(created.id).await.expect("get trip");
        assert_eq!(loaded, created);
        assert_eq!(loaded.days[2].target_km, 50.0);
        assert!(loaded.days[0].segment.is_some());
    }

    #[tokio::test]
    async fn create_trip_rejects_zero_daily_distance() {
        let (_dir, app) = setup_app().await;
        let err = app
            .create_trip(TripInput {
                name: "Rhine".to_string(),
                route: route(100.0),
                daily_distance_km: 0.0,
                start_date: date(1),
                budget: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
        assert!(app.list_trips().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn rest_day_round_trips_through_store() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 250.0, 100.0).await;
        let updated = app
            .insert_rest_day(trip.id, trip.days[1].id)
            .await
            .expect("insert rest day");
        assert_eq!(updated.days.len(), 4);

        let loaded = app.get_trip(trip.id).await.expect("get trip");
        assert_eq!(loaded.days, updated.days);
        assert!(loaded.days[2].is_rest_day());
        assert_eq!(loaded.days[3].date, date(4));
    }

    #[tokio::test]
    async fn rejected_date_edit_leaves_store_unchanged() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 300.0, 100.0).await;
        let err = app
            .update_day_date(trip.id, trip.days[0].id, trip.days[1].date)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let loaded = app.get_trip(trip.id).await.expect("get trip");
        assert_eq!(loaded.days, trip.days);
    }

    #[tokio::test]
    async fn removing_last_remaining_day_is_rejected() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 60.0, 100.0).await;
        let err = app.remove_day(trip.id, trip.days[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
        assert_eq!(app.get_trip(trip.id).await.expect("get").days.len(), 1);
    }

    #[tokio::test]
    async fn completing_days_drives_trip_status() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 200.0, 100.0).await;
        let active = app
            .complete_day(trip.id, trip.days[0].id, Some(104.0))
            .await
            .expect("complete");
        assert_eq!(active.status, TripStatus::Active);
        assert_eq!(active.days[0].actual_km, Some(104.0));

        let done = app
            .complete_day(trip.id, trip.days[1].id, None)
            .await
            .expect("complete");
        assert_eq!(done.status, TripStatus::Completed);
        assert_eq!(done.days[1].actual_km, Some(100.0));
        let stored = app.get_trip(trip.id).await.expect("get");
        assert_eq!(stored.status, TripStatus::Completed);
    }

    #[tokio::test]
    async fn pause_and_resume_are_explicit() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 200.0, 100.0).await;
        let paused = app
            .update_trip(
                trip.id,
                TripChanges {
                    status: Some(TripStatus::Paused),
                    ..Default::default()
                },
            )
            .await
            .expect("pause");
        assert_eq!(paused.status, TripStatus::Paused);

        let still_paused = app
            .complete_day(trip.id, trip.days[0].id, None)
            .await
            .expect("complete");
        assert_eq!(still_paused.status, TripStatus::Paused);

        let resumed = app
            .update_trip(
                trip.id,
                TripChanges {
                    status: Some(TripStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .expect("resume");
        assert_eq!(resumed.status, TripStatus::Active);

        let err = app
            .update_trip(
                trip.id,
                TripChanges {
                    status: Some(TripStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn removing_day_unlinks_its_expenses() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 300.0, 100.0).await;
        let mut input = expense_input(25.0, ExpenseCategory::Food);
        input.day_plan_id = Some(trip.days[1].id);
        let expense = app.add_expense(trip.id, input).await.expect("add expense");
        assert_eq!(expense.currency, "EUR");

        app.remove_day(trip.id, trip.days[1].id)
            .await
            .expect("remove day");
        let after = app.get_expense(expense.id).await.expect("get expense");
        assert_eq!(after.day_plan_id, None);
        assert_eq!(after.amount, 25.0);
    }

    #[tokio::test]
    async fn delete_trip_cascades() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 300.0, 100.0).await;
        app.add_expense(trip.id, expense_input(10.0, ExpenseCategory::Transport))
            .await
            .expect("add expense");
        app.delete_trip(trip.id).await.expect("delete trip");

        assert!(matches!(
            app.get_trip(trip.id).await,
            Err(AppError::NotFound(_))
        ));
        let days = day_plan::Entity::find().count(&app.db).await.expect("count days");
        let expenses = expense::Entity::find()
            .count(&app.db)
            .await
            .expect("count expenses");
        assert_eq!((days, expenses), (0, 0));
        assert!(matches!(
            app.delete_trip(trip.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn budget_status_uses_trip_budget() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 200.0, 100.0).await;
        app.add_expense(trip.id, expense_input(60.0, ExpenseCategory::Accommodation))
            .await
            .expect("add");
        app.add_expense(trip.id, expense_input(30.0, ExpenseCategory::Food))
            .await
            .expect("add");
        let status = app
            .budget_status(trip.id)
            .await
            .expect("budget")
            .expect("trip has budget");
        assert_eq!(status.spent, 90.0);
        assert!(status.is_near_budget);

        let summary = app.expense_summary(trip.id).await.expect("summary");
        assert_eq!(summary.by_category[&ExpenseCategory::Transport], 0.0);
        assert_eq!(summary.total_amount, 90.0);
    }

    #[tokio::test]
    async fn expenses_can_be_updated_sorted_and_deleted() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 200.0, 100.0).await;
        let first = app
            .add_expense(trip.id, expense_input(12.0, ExpenseCategory::Food))
            .await
            .expect("add");
        let second = app
            .add_expense(trip.id, expense_input(40.0, ExpenseCategory::Repairs))
            .await
            .expect("add");

        let updated = app
            .update_expense(
                first.id,
                ExpenseChanges {
                    amount: Some(55.0),
                    country: Some("Slovakia".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.amount, 55.0);
        assert_eq!(updated.country.as_deref(), Some("Slovakia"));

        let sorted = app
            .list_expenses(
                trip.id,
                &ExpenseQuery {
                    sort: Some(SortBy::AmountDesc),
                    ..Default::default()
                },
            )
            .await
            .expect("list");
        let ids: Vec<i64> = sorted.iter().map(|expense| expense.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let err = app.delete_expenses(&[second.id, 999]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(app.delete_expenses(&[second.id, second.id]).await.expect("delete"), 1);
    }

    #[tokio::test]
    async fn expense_rejects_negative_amount_and_foreign_day() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 200.0, 100.0).await;
        let err = app
            .add_expense(trip.id, expense_input(-3.0, ExpenseCategory::Other))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));

        let mut input = expense_input(3.0, ExpenseCategory::Other);
        input.day_plan_id = Some(Uuid::new_v4());
        let err = app.add_expense(trip.id, input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn adjust_remaining_redistributes_in_store() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 400.0, 100.0).await;
        app.complete_day(trip.id, trip.days[0].id, Some(70.0))
            .await
            .expect("complete");
        let adjusted = app.adjust_remaining(trip.id, 0).await.expect("adjust");
        let targets: Vec<f64> = adjusted.days.iter().map(|day| day.target_km).collect();
        assert_eq!(targets, vec![70.0, 110.0, 110.0, 110.0]);
        let (_, stats) = app.trip_stats(trip.id).await.expect("stats");
        assert_eq!(stats.completed_km, 70.0);
    }

    #[tokio::test]
    async fn long_schedules_are_stored_and_rewritten() {
        let (_dir, app) = setup_app().await;
        let trip = create_trip(&app, 3000.0, 1.0).await;
        assert_eq!(trip.days.len(), 3000);

        let loaded = app.get_trip(trip.id).await.expect("get trip");
        assert_eq!(loaded.days.len(), 3000);
        assert_eq!(loaded.days[2999].end_km(), 3000.0);

        let edited = app
            .insert_rest_day(trip.id, loaded.days[0].id)
            .await
            .expect("insert rest day");
        assert_eq!(edited.days.len(), 3001);
        let stored = day_plan::Entity::find()
            .filter(day_plan::Column::TripId.eq(trip.id))
            .count(&app.db)
            .await
            .expect("count days");
        assert_eq!(stored, 3001);
    }
}
