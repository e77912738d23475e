use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "season_passes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External id (`ORD-...`) sent to the payment provider.
    #[sea_orm(unique)]
    pub order_id: String,

    pub user_id: i32,

    pub series_id: i32,

    /// pending | active | expired | refunded | failed
    pub status: String,

    /// Amounts are in agorot.
    pub price: i64,

    pub discount_amount: i64,

    pub final_price: i64,

    pub currency: String,

    pub coupon_code: Option<String>,

    pub customer_email: String,

    pub customer_name: String,

    pub customer_phone: Option<String>,

    pub transaction_id: Option<String>,

    pub invoice_url: Option<String>,

    pub invoice_number: Option<String>,

    pub purchased_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::series::Entity",
        from = "Column::SeriesId",
        to = "super::series::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Series,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Series.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
