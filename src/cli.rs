use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use tourplan::model::{ExpenseCategory, GroupBy, SortBy, TripStatus};

#[derive(Parser, Debug)]
#[command(
    name = "tourplan",
    version,
    about = "Plan multi-day bike tours, track riding progress and expenses"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "TOURPLAN_HOME",
        help = "Directory holding tourplan.db (default: ~/.tourplan)"
    )]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Trip(TripCommand),
    #[command(subcommand)]
    Day(DayCommand),
    #[command(subcommand)]
    Expense(ExpenseCommand),
}

impl Command {
    /// Read-only commands still take the lock, but only its shared half.
    pub fn is_read_only(&self) -> bool {
        match self {
            Command::Trip(command) => matches!(
                command,
                TripCommand::List(_)
                    | TripCommand::Show(_)
                    | TripCommand::Stats(_)
                    | TripCommand::Export(_)
            ),
            Command::Day(_) => false,
            Command::Expense(command) => matches!(
                command,
                ExpenseCommand::List(_) | ExpenseCommand::Summary(_) | ExpenseCommand::Budget(_)
            ),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TripCommand {
    Create(TripCreate),
    List(TripList),
    Show(TripShow),
    Stats(TripShow),
    Export(TripExport),
    Update(TripUpdate),
    Remove(TripShow),
    Adjust(TripAdjust),
}

#[derive(Subcommand, Debug)]
pub enum DayCommand {
    Distance(DayDistance),
    Date(DayDate),
    Rest(DayRest),
    Remove(DayRef),
    Start(DayRef),
    Done(DayDone),
    Skip(DayRef),
    Note(DayNote),
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAdd),
    List(ExpenseList),
    Update(ExpenseUpdate),
    Remove(ExpenseRemove),
    Summary(ExpenseTrip),
    Budget(ExpenseTrip),
}

#[derive(Args, Debug)]
pub struct TripCreate {
    pub name: String,
    #[arg(long, value_name = "FILE", help = "Route JSON file")]
    pub route: PathBuf,
    #[arg(long, value_name = "KM")]
    pub daily_km: f64,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub start: NaiveDate,
    #[arg(long, value_name = "AMOUNT")]
    pub budget: Option<f64>,
    #[arg(long, requires = "budget")]
    pub currency: Option<String>,
}

#[derive(Args, Debug)]
pub struct TripList {}

#[derive(Args, Debug)]
pub struct TripShow {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct TripExport {
    pub id: i64,
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct TripUpdate {
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, value_name = "KM")]
    pub daily_km: Option<f64>,
    #[arg(long, value_name = "AMOUNT", conflicts_with = "clear_budget")]
    pub budget: Option<f64>,
    #[arg(long, requires = "budget")]
    pub currency: Option<String>,
    #[arg(long)]
    pub clear_budget: bool,
    #[arg(long, value_enum)]
    pub status: Option<TripStatusArg>,
}

#[derive(Args, Debug)]
pub struct TripAdjust {
    pub id: i64,
    #[arg(long, value_name = "DAY", help = "Last ridden day (1-based)")]
    pub through: usize,
}

#[derive(Args, Debug)]
pub struct DayRef {
    pub trip_id: i64,
    #[arg(value_name = "DAY")]
    pub day: usize,
}

#[derive(Args, Debug)]
pub struct DayDistance {
    pub trip_id: i64,
    #[arg(value_name = "DAY")]
    pub day: usize,
    #[arg(value_name = "KM", allow_negative_numbers = true)]
    pub km: f64,
}

#[derive(Args, Debug)]
pub struct DayDate {
    pub trip_id: i64,
    #[arg(value_name = "DAY")]
    pub day: usize,
    #[arg(value_name = "YYYY-MM-DD")]
    pub date: NaiveDate,
}

#[derive(Args, Debug)]
pub struct DayRest {
    pub trip_id: i64,
    #[arg(long, value_name = "DAY")]
    pub after: usize,
}

#[derive(Args, Debug)]
pub struct DayDone {
    pub trip_id: i64,
    #[arg(value_name = "DAY")]
    pub day: usize,
    #[arg(long, value_name = "KM", help = "Ridden distance (default: planned)")]
    pub actual: Option<f64>,
}

#[derive(Args, Debug)]
pub struct DayNote {
    pub trip_id: i64,
    #[arg(value_name = "DAY")]
    pub day: usize,
    #[arg(value_name = "TEXT", help = "Empty text clears the note")]
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ExpenseAdd {
    pub trip_id: i64,
    #[arg(allow_negative_numbers = true)]
    pub amount: f64,
    #[arg(long, value_enum)]
    pub category: CategoryArg,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Defaults to the day's date, else today")]
    pub date: Option<NaiveDate>,
    #[arg(long, value_name = "DAY")]
    pub day: Option<usize>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExpenseList {
    pub trip_id: i64,
    #[arg(long, value_enum, default_value = "none")]
    pub group_by: GroupByArg,
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,
    #[arg(long, value_name = "DAY")]
    pub day: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExpenseUpdate {
    pub id: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<f64>,
    #[arg(long, value_enum)]
    pub category: Option<CategoryArg>,
    #[arg(long)]
    pub currency: Option<String>,
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
    #[arg(long, value_name = "DAY")]
    pub day: Option<usize>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExpenseRemove {
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct ExpenseTrip {
    pub trip_id: i64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TripStatusArg {
    Active,
    Paused,
}

impl From<TripStatusArg> for TripStatus {
    fn from(value: TripStatusArg) -> Self {
        match value {
            TripStatusArg::Active => TripStatus::Active,
            TripStatusArg::Paused => TripStatus::Paused,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CategoryArg {
    Accommodation,
    Food,
    Transport,
    Repairs,
    Other,
}

impl From<CategoryArg> for ExpenseCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Accommodation => ExpenseCategory::Accommodation,
            CategoryArg::Food => ExpenseCategory::Food,
            CategoryArg::Transport => ExpenseCategory::Transport,
            CategoryArg::Repairs => ExpenseCategory::Repairs,
            CategoryArg::Other => ExpenseCategory::Other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GroupByArg {
    None,
    Day,
    Category,
    Country,
}

impl From<GroupByArg> for GroupBy {
    fn from(value: GroupByArg) -> Self {
        match value {
            GroupByArg::None => GroupBy::None,
            GroupByArg::Day => GroupBy::Day,
            GroupByArg::Category => GroupBy::Category,
            GroupByArg::Country => GroupBy::Country,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SortArg {
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl From<SortArg> for SortBy {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::DateDesc => SortBy::DateDesc,
            SortArg::DateAsc => SortBy::DateAsc,
            SortArg::AmountDesc => SortBy::AmountDesc,
            SortArg::AmountAsc => SortBy::AmountAsc,
        }
    }
}
