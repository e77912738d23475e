use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "series")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    pub description: Option<String>,

    pub poster_url: Option<String>,

    pub total_episodes: i32,

    /// Episodes `1..=free_episodes_count` are watchable without a pass.
    pub free_episodes_count: i32,

    /// Season pass price in agorot. `None` falls back to the configured default.
    pub season_pass_price: Option<i64>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::episodes::Entity")]
    Episodes,
    #[sea_orm(has_many = "super::season_passes::Entity")]
    SeasonPasses,
}

impl Related<super::episodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Episodes.def()
    }
}

impl Related<super::season_passes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeasonPasses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
