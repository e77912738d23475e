use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lowercased.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Bearer token (64-char hex string)
    #[sea_orm(unique)]
    pub api_key: String,

    pub is_admin: bool,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::season_passes::Entity")]
    SeasonPasses,
}

impl Related<super::season_passes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeasonPasses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
