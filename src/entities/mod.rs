pub mod day_plan;
pub mod expense;
pub mod trip;
