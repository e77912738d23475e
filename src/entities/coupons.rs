use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored uppercased.
    #[sea_orm(unique)]
    pub code: String,

    /// "percentage" or "fixed"
    pub discount_type: String,

    /// Percent for percentage coupons, shekels for fixed ones.
    pub discount_value: f64,

    /// `None` means the coupon applies to every series.
    pub series_id: Option<i32>,

    pub max_uses: Option<i32>,

    pub used_count: i32,

    pub valid_from: Option<DateTimeUtc>,

    pub valid_until: Option<DateTimeUtc>,

    pub is_active: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::series::Entity",
        from = "Column::SeriesId",
        to = "super::series::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Series,
}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Series.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
