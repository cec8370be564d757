//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_tables;
mod m20250101_000002_create_trip_table;
mod m20250101_000003_create_buddy_tables;
mod m20250101_000004_create_activity_tables;
mod m20250101_000005_create_event_tables;
mod m20250101_000006_create_invitation_and_conversation_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_tables::Migration),
            Box::new(m20250101_000002_create_trip_table::Migration),
            Box::new(m20250101_000003_create_buddy_tables::Migration),
            Box::new(m20250101_000004_create_activity_tables::Migration),
            Box::new(m20250101_000005_create_event_tables::Migration),
            Box::new(m20250101_000006_create_invitation_and_conversation_tables::Migration),
        ]
    }
}
