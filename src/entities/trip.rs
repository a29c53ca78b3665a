use sea_orm::entity::prelude::*;

use super::{day_plan, expense};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// JSON-encoded `RouteSource`.
    pub route_source: String,
    pub daily_distance_km: f64,
    pub total_distance_km: f64,
    pub status: String,
    pub budget_amount: Option<f64>,
    pub budget_currency: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    DayPlan,
    Expense,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::DayPlan => Entity::has_many(day_plan::Entity).into(),
            Self::Expense => Entity::has_many(expense::Entity).into(),
        }
    }
}

impl Related<day_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DayPlan.def()
    }
}

impl Related<expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
