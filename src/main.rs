mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::cli::{
    Cli, Command, DayCommand, DayDate, DayDistance, DayDone, DayNote, DayRef, DayRest,
    ExpenseAdd, ExpenseCommand, ExpenseList, ExpenseRemove, ExpenseTrip, ExpenseUpdate,
    TripAdjust, TripCommand, TripCreate, TripExport, TripShow, TripUpdate,
};
use tourplan::app::App;
use tourplan::db;
use tourplan::error::AppError;
use tourplan::expenses::group_expenses;
use tourplan::model::{
    Budget, DayStatus, ExpenseChanges, ExpenseInput, ExpenseQuery, TripChanges, TripInput, TripPlan,
    TripStatus, DEFAULT_CURRENCY,
};
use tourplan::progress::{calculate_trip_stats, next_riding_day};
use tourplan::route::Route;
use tourplan::util::{
    format_amount, format_budget_status, format_day_line, format_expense_groups,
    format_expense_summary, format_km, format_trip_detail, format_trip_markdown,
    format_trip_stats,
};

const LOG_ENV: &str = "TOURPLAN_LOG";
const DATA_DIR_NAME: &str = ".tourplan";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli { data_dir, command } = Cli::parse();
    let data_dir = resolve_data_dir(data_dir)?;
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    debug!(path = %db_path.display(), "using database");

    let mut lock = db::open_lock(&db_path)?;
    if command.is_read_only() {
        let _guard = lock.read()?;
        execute(&db_path, command).await
    } else {
        let _guard = lock.write()?;
        execute(&db_path, command).await
    }
}

async fn execute(db_path: &Path, command: Command) -> Result<(), AppError> {
    let db = db::connect(db_path).await?;
    db::ensure_schema(&db).await?;
    let app = App::new(db);

    match command {
        Command::Trip(command) => handle_trip(&app, command).await,
        Command::Day(command) => handle_day(&app, command).await,
        Command::Expense(command) => handle_expense(&app, command).await,
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(DATA_DIR_NAME)),
        None => Err(AppError::InvalidParameter(
            "unable to resolve data directory; pass --data-dir or set TOURPLAN_HOME".to_string(),
        )),
    }
}

async fn handle_trip(app: &App, command: TripCommand) -> Result<(), AppError> {
    match command {
        TripCommand::Create(args) => handle_trip_create(app, args).await,
        TripCommand::List(_) => handle_trip_list(app).await,
        TripCommand::Show(args) => handle_trip_show(app, args).await,
        TripCommand::Stats(args) => handle_trip_stats(app, args).await,
        TripCommand::Export(args) => handle_trip_export(app, args).await,
        TripCommand::Update(args) => handle_trip_update(app, args).await,
        TripCommand::Remove(args) => handle_trip_remove(app, args).await,
        TripCommand::Adjust(args) => handle_trip_adjust(app, args).await,
    }
}

async fn handle_day(app: &App, command: DayCommand) -> Result<(), AppError> {
    match command {
        DayCommand::Distance(args) => handle_day_distance(app, args).await,
        DayCommand::Date(args) => handle_day_date(app, args).await,
        DayCommand::Rest(args) => handle_day_rest(app, args).await,
        DayCommand::Remove(args) => handle_day_remove(app, args).await,
        DayCommand::Start(args) => handle_day_start(app, args).await,
        DayCommand::Done(args) => handle_day_done(app, args).await,
        DayCommand::Skip(args) => handle_day_skip(app, args).await,
        DayCommand::Note(args) => handle_day_note(app, args).await,
    }
}

async fn handle_expense(app: &App, command: ExpenseCommand) -> Result<(), AppError> {
    match command {
        ExpenseCommand::Add(args) => handle_expense_add(app, args).await,
        ExpenseCommand::List(args) => handle_expense_list(app, args).await,
        ExpenseCommand::Update(args) => handle_expense_update(app, args).await,
        ExpenseCommand::Remove(args) => handle_expense_remove(app, args).await,
        ExpenseCommand::Summary(args) => handle_expense_summary(app, args).await,
        ExpenseCommand::Budget(args) => handle_expense_budget(app, args).await,
    }
}

async fn handle_trip_create(app: &App, args: TripCreate) -> Result<(), AppError> {
    let route = Route::from_json_file(&args.route)?;
    let budget = args.budget.map(|amount| Budget {
        amount,
        currency: currency_or_default(args.currency, None),
    });
    let trip = app
        .create_trip(TripInput {
            name: args.name,
            route,
            daily_distance_km: args.daily_km,
            start_date: args.start,
            budget,
        })
        .await?;

    println!(
        "Created trip ID: {}: {} (days: {}, km: {})",
        trip.id,
        trip.name,
        trip.days.len(),
        format_km(trip.total_distance_km)
    );
    Ok(())
}

async fn handle_trip_list(app: &App) -> Result<(), AppError> {
    let trips = app.list_trips().await?;
    if trips.is_empty() {
        println!("No trips.");
        return Ok(());
    }
    print_trip_list(&trips);
    Ok(())
}

async fn handle_trip_show(app: &App, args: TripShow) -> Result<(), AppError> {
    let trip = app.get_trip(args.id).await?;
    println!("{}", format_trip_detail(&trip));
    Ok(())
}

async fn handle_trip_stats(app: &App, args: TripShow) -> Result<(), AppError> {
    let (trip, stats) = app.trip_stats(args.id).await?;
    println!("{}", format_trip_stats(&trip, &stats, next_riding_day(&trip)));
    Ok(())
}

async fn handle_trip_export(app: &App, args: TripExport) -> Result<(), AppError> {
    let trip = app.get_trip(args.id).await?;
    let stats = calculate_trip_stats(&trip);
    db::ensure_parent_dir(&args.path)?;
    fs::write(&args.path, format_trip_markdown(&trip, &stats))?;
    println!("Exported trip ID: {} to {}", trip.id, args.path.display());
    Ok(())
}

async fn handle_trip_update(app: &App, args: TripUpdate) -> Result<(), AppError> {
    let budget = match args.budget {
        Some(amount) => {
            let current = app.get_trip(args.id).await?;
            let existing = current.budget.map(|budget| budget.currency);
            Some(Budget {
                amount,
                currency: currency_or_default(args.currency, existing),
            })
        }
        None => None,
    };
    let trip = app
        .update_trip(
            args.id,
            TripChanges {
                name: args.name,
                daily_distance_km: args.daily_km,
                status: args.status.map(TripStatus::from),
                budget,
                clear_budget: args.clear_budget,
            },
        )
        .await?;

    println!(
        "Updated trip ID: {}: {} ({})",
        trip.id,
        trip.name,
        trip.status.as_str()
    );
    Ok(())
}

async fn handle_trip_remove(app: &App, args: TripShow) -> Result<(), AppError> {
    app.delete_trip(args.id).await?;
    println!("Trip ID: {} removed.", args.id);
    Ok(())
}

async fn handle_trip_adjust(app: &App, args: TripAdjust) -> Result<(), AppError> {
    let through_index = position_to_index(args.through)?;
    let trip = app.adjust_remaining(args.id, through_index).await?;
    println!(
        "Adjusted trip ID: {} after day {}.",
        trip.id, args.through
    );
    print_days(&trip, 0);
    Ok(())
}

async fn handle_day_distance(app: &App, args: DayDistance) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app
        .update_day_distance(args.trip_id, day_id, args.km)
        .await?;
    println!(
        "Updated day {} of trip ID: {} to {} km.",
        args.day,
        trip.id,
        format_km(args.km)
    );
    print_days(&trip, args.day - 1);
    Ok(())
}

async fn handle_day_date(app: &App, args: DayDate) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app.update_day_date(args.trip_id, day_id, args.date).await?;
    println!(
        "Moved day {} of trip ID: {} to {}.",
        args.day,
        trip.id,
        args.date.format("%Y-%m-%d")
    );
    print_days(&trip, 0);
    Ok(())
}

async fn handle_day_rest(app: &App, args: DayRest) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.after).await?;
    let trip = app.insert_rest_day(args.trip_id, day_id).await?;
    println!(
        "Inserted rest day {} in trip ID: {}.",
        args.after + 1,
        trip.id
    );
    print_days(&trip, args.after);
    Ok(())
}

async fn handle_day_remove(app: &App, args: DayRef) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app.remove_day(args.trip_id, day_id).await?;
    println!("Removed day {} from trip ID: {}.", args.day, trip.id);
    print_days(&trip, args.day - 1);
    Ok(())
}

async fn handle_day_start(app: &App, args: DayRef) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app.start_day(args.trip_id, day_id).await?;
    println!("Started day {} of trip ID: {}.", args.day, trip.id);
    Ok(())
}

async fn handle_day_done(app: &App, args: DayDone) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app.complete_day(args.trip_id, day_id, args.actual).await?;
    let ridden = trip.day_at(args.day)?.ridden_km();
    println!(
        "Completed day {} of trip ID: {} ({} km).",
        args.day,
        trip.id,
        format_km(ridden)
    );
    notify_trip_status(&trip);
    Ok(())
}

async fn handle_day_skip(app: &App, args: DayRef) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app.skip_day(args.trip_id, day_id).await?;
    println!("Skipped day {} of trip ID: {}.", args.day, trip.id);
    notify_trip_status(&trip);
    Ok(())
}

async fn handle_day_note(app: &App, args: DayNote) -> Result<(), AppError> {
    let day_id = resolve_day(app, args.trip_id, args.day).await?;
    let trip = app
        .set_day_notes(args.trip_id, day_id, Some(args.text))
        .await?;
    if trip.day_at(args.day)?.notes.is_some() {
        println!("Updated note for day {} of trip ID: {}.", args.day, trip.id);
    } else {
        println!("Cleared note for day {} of trip ID: {}.", args.day, trip.id);
    }
    Ok(())
}

async fn handle_expense_add(app: &App, args: ExpenseAdd) -> Result<(), AppError> {
    let trip = app.get_trip(args.trip_id).await?;
    let day = match args.day {
        Some(position) => Some(trip.day_at(position)?),
        None => None,
    };
    let date = args
        .date
        .or_else(|| day.map(|day| day.date))
        .unwrap_or_else(today);
    let trip_currency = trip.budget.as_ref().map(|budget| budget.currency.clone());
    let expense = app
        .add_expense(
            trip.id,
            ExpenseInput {
                day_plan_id: day.map(|day| day.id),
                date,
                amount: args.amount,
                currency: currency_or_default(args.currency, trip_currency),
                category: args.category.into(),
                description: args.note,
                country: args.country,
            },
        )
        .await?;

    println!(
        "Added expense ID: {}: {} [{}]",
        expense.id,
        format_amount(expense.amount, &expense.currency),
        expense.category.as_str()
    );
    Ok(())
}

async fn handle_expense_list(app: &App, args: ExpenseList) -> Result<(), AppError> {
    let trip = app.get_trip(args.trip_id).await?;
    let day_plan_id = match args.day {
        Some(position) => Some(trip.day_at(position)?.id),
        None => None,
    };
    let expenses = app
        .list_expenses(
            trip.id,
            &ExpenseQuery {
                day_plan_id,
                sort: args.sort.map(Into::into),
            },
        )
        .await?;
    let groups = group_expenses(&expenses, args.group_by.into());
    println!("{}", format_expense_groups(&trip, &groups));
    Ok(())
}

async fn handle_expense_update(app: &App, args: ExpenseUpdate) -> Result<(), AppError> {
    let day_plan_id = match args.day {
        Some(position) => {
            let existing = app.get_expense(args.id).await?;
            let trip = app.get_trip(existing.trip_id).await?;
            Some(trip.day_at(position)?.id)
        }
        None => None,
    };
    let expense = app
        .update_expense(
            args.id,
            ExpenseChanges {
                day_plan_id,
                date: args.date,
                amount: args.amount,
                currency: args.currency,
                category: args.category.map(Into::into),
                description: args.note,
                country: args.country,
            },
        )
        .await?;

    println!(
        "Updated expense ID: {}: {} [{}]",
        expense.id,
        format_amount(expense.amount, &expense.currency),
        expense.category.as_str()
    );
    Ok(())
}

async fn handle_expense_remove(app: &App, args: ExpenseRemove) -> Result<(), AppError> {
    let deleted = app.delete_expenses(&args.ids).await?;
    if args.ids.len() == 1 {
        println!("Expense ID: {} removed.", args.ids[0]);
    } else {
        println!("Removed {deleted} expenses.");
    }
    Ok(())
}

async fn handle_expense_summary(app: &App, args: ExpenseTrip) -> Result<(), AppError> {
    let trip = app.get_trip(args.trip_id).await?;
    let summary = app.expense_summary(trip.id).await?;
    println!("{}", format_expense_summary(&trip, &summary));
    Ok(())
}

async fn handle_expense_budget(app: &App, args: ExpenseTrip) -> Result<(), AppError> {
    match app.budget_status(args.trip_id).await? {
        Some(status) => println!("{}", format_budget_status(&status)),
        None => println!("Trip ID: {} has no budget.", args.trip_id),
    }
    Ok(())
}

async fn resolve_day(app: &App, trip_id: i64, position: usize) -> Result<Uuid, AppError> {
    let trip = app.get_trip(trip_id).await?;
    Ok(trip.day_at(position)?.id)
}

fn position_to_index(position: usize) -> Result<usize, AppError> {
    position
        .checked_sub(1)
        .ok_or_else(|| AppError::InvalidParameter("days are numbered from 1".to_string()))
}

fn currency_or_default(requested: Option<String>, existing: Option<String>) -> String {
    requested
        .map(|currency| currency.trim().to_uppercase())
        .filter(|currency| !currency.is_empty())
        .or(existing)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn notify_trip_status(trip: &TripPlan) {
    if trip.status == TripStatus::Completed {
        println!("Trip ID: {} completed.", trip.id);
    }
}

/// Prints the schedule from `from_index` on, which is where an edit can
/// have moved boundaries.
fn print_days(trip: &TripPlan, from_index: usize) {
    for (idx, day) in trip.days.iter().enumerate().skip(from_index) {
        println!("{}", format_day_line(idx + 1, day));
    }
}

fn print_trip_list(trips: &[TripPlan]) {
    println!(
        "{:<4} {:<9} {:<6} {:<9} {}",
        "ID", "STAT", "DAYS", "KM", "NAME"
    );
    for trip in trips {
        let completed = trip
            .days
            .iter()
            .filter(|day| day.status == DayStatus::Completed)
            .count();
        println!(
            "{:<4} {:<9} {:<6} {:<9} {}",
            trip.id,
            trip.status.as_str(),
            format!("{}/{}", completed, trip.days.len()),
            format_km(trip.total_distance_km),
            trip.name
        );
    }
}
