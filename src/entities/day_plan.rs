use sea_orm::entity::prelude::*;

use super::trip;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "day_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub trip_id: i64,
    pub sort_order: i32,
    pub date: Date,
    pub start_km: f64,
    pub target_km: f64,
    pub actual_km: Option<f64>,
    pub status: String,
    pub segment_start_lat: Option<f64>,
    pub segment_start_lon: Option<f64>,
    pub segment_end_lat: Option<f64>,
    pub segment_end_lon: Option<f64>,
    pub notes: Option<String>,
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
