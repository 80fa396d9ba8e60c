//! Database connection and table creation using SeaORM.
//!
//! Tables are generated from the entity definitions via
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Secondary indexes (and the composite unique index on group
//! memberships) are plain SQL, since the entity derive cannot express them.

use crate::entities::{Commission, Contribution, Group, GroupMembership, Payout, Setting, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

/// Opens the database and ensures all tables and indexes exist.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database: {database_url}");
    let db = Database::connect(database_url).await?;
    create_tables(&db).await?;
    info!("Database initialized");
    Ok(db)
}

/// Creates all tables from the entity definitions, then the indexes.
/// Idempotent: safe to call on an already-initialized database.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut users = schema.create_table_from_entity(User);
    users.if_not_exists();
    db.execute(builder.build(&users)).await?;

    let mut groups = schema.create_table_from_entity(Group);
    groups.if_not_exists();
    db.execute(builder.build(&groups)).await?;

    let mut memberships = schema.create_table_from_entity(GroupMembership);
    memberships.if_not_exists();
    db.execute(builder.build(&memberships)).await?;

    let mut contributions = schema.create_table_from_entity(Contribution);
    contributions.if_not_exists();
    db.execute(builder.build(&contributions)).await?;

    let mut payouts = schema.create_table_from_entity(Payout);
    payouts.if_not_exists();
    db.execute(builder.build(&payouts)).await?;

    let mut commissions = schema.create_table_from_entity(Commission);
    commissions.if_not_exists();
    db.execute(builder.build(&commissions)).await?;

    let mut settings = schema.create_table_from_entity(Setting);
    settings.if_not_exists();
    db.execute(builder.build(&settings)).await?;

    // One membership row per (group, user); removal soft-deletes in place.
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_group_members_group_user \
         ON group_members(group_id, user_id)",
    )
    .await?;
    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_contributions_user ON contributions(user_id)",
    )
    .await?;
    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_contributions_group ON contributions(group_id)",
    )
    .await?;
    db.execute_unprepared("CREATE INDEX IF NOT EXISTS idx_payouts_user ON payouts(user_id)")
        .await?;
    db.execute_unprepared("CREATE INDEX IF NOT EXISTS idx_payouts_group ON payouts(group_id)")
        .await?;
    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_commissions_source ON commissions(source, source_id)",
    )
    .await?;

    Ok(())
}
