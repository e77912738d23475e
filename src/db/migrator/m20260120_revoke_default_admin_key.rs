use crate::db::repositories::user::{generate_api_key, hash_password};
use crate::entities::prelude::*;
use crate::entities::users;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Key that earlier builds seeded for `admin@seasonpass.local`.
const LEGACY_ADMIN_API_KEY: &str = "seasonpass_default_admin_key_please_regenerate";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Replace both credentials with values nobody knows; the row stays
        // so existing order history keeps its owner.
        let password_hash = hash_password(&generate_api_key(), None)
            .map_err(|e| DbErr::Migration(e.to_string()))?;

        let update = Query::update()
            .table(Users)
            .values([
                (users::Column::ApiKey, generate_api_key().into()),
                (users::Column::PasswordHash, password_hash.into()),
                (users::Column::UpdatedAt, chrono::Utc::now().into()),
            ])
            .and_where(Expr::col(users::Column::ApiKey).eq(LEGACY_ADMIN_API_KEY))
            .to_owned();

        manager.exec_stmt(update).await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        Ok(())
    }
}
