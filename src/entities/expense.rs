use sea_orm::entity::prelude::*;

use super::trip;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trip_id: i64,
    /// Loose reference: day rows are rewritten on every schedule edit.
    pub day_plan_id: Option<Uuid>,
    pub date: Date,
    pub amount: f64,
    pub currency: String,
    pub category: String,
    pub description: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Trip,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Trip => Entity::belongs_to(trip::Entity)
                .from(Column::TripId)
                .to(trip::Column::Id)
                .into(),
        }
    }
}

impl Related<trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
