use sea_orm_migration::prelude::*;

mod m20260101_initial;
mod m20260102_add_users;
mod m20260110_season_pass_indexes;
mod m20260120_revoke_default_admin_key;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_initial::Migration),
            Box::new(m20260102_add_users::Migration),
            Box::new(m20260110_season_pass_indexes::Migration),
            Box::new(m20260120_revoke_default_admin_key::Migration),
        ]
    }
}
