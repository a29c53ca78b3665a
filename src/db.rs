use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use tracing::debug;
use url::Url;

use crate::entities::{day_plan, expense, trip};
use crate::error::AppError;

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("tourplan.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Lock file guarding the database; holding its write half serializes edits
/// across processes.
pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path).map_err(|_| {
        AppError::InvalidParameter(format!("invalid sqlite path: {}", path.display()))
    })?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    debug!(url = %sqlite_url, "connecting to database");
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut trip_stmt = schema.create_table_from_entity(trip::Entity);
    trip_stmt.if_not_exists();
    db.execute(builder.build(&trip_stmt)).await?;

    let mut day_stmt = schema.create_table_from_entity(day_plan::Entity);
    day_stmt.if_not_exists();
    db.execute(builder.build(&day_stmt)).await?;

    let mut expense_stmt = schema.create_table_from_entity(expense::Entity);
    expense_stmt.if_not_exists();
    db.execute(builder.build(&expense_stmt)).await?;

    let mut day_date_index = Index::create()
        .name("idx_day_plans_trip_date")
        .table(day_plan::Entity)
        .col(day_plan::Column::TripId)
        .col(day_plan::Column::Date)
        .unique()
        .to_owned();
    day_date_index.if_not_exists();
    db.execute(builder.build(&day_date_index)).await?;

    let mut day_order_index = Index::create()
        .name("idx_day_plans_trip_order")
        .table(day_plan::Entity)
        .col(day_plan::Column::TripId)
        .col(day_plan::Column::SortOrder)
        .to_owned();
    day_order_index.if_not_exists();
    db.execute(builder.build(&day_order_index)).await?;

    let mut expense_index = Index::create()
        .name("idx_expenses_trip_date")
        .table(expense::Entity)
        .col(expense::Column::TripId)
        .col(expense::Column::Date)
        .to_owned();
    expense_index.if_not_exists();
    db.execute(builder.build(&expense_index)).await?;

    Ok(())
}
