pub use sea_orm_migration::prelude::*;

mod m20250712_000001_create_catalog;
mod m20250712_000002_create_opinions;
mod m20250802_000001_create_assist_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250712_000001_create_catalog::Migration),
            Box::new(m20250712_000002_create_opinions::Migration),
            Box::new(m20250802_000001_create_assist_log::Migration),
        ]
    }
}
