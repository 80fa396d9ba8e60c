use ajo_ledger::{
    config,
    core::user::{self, UserProfile},
    db,
    entities::{User, user::UserRole},
    errors::Result,
    gateway::OfflineGateway,
    sync::Reconciler,
};
use dotenvy::dotenv;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use std::{env, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; non-fatal, env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load()?;
    info!("Configuration loaded");

    // 4. Initialize database and schema
    let db = db::init_db(&app_config.database_url).await?;
    info!("Database initialized at {}", app_config.database_url);

    // 5. Seed the first admin account on an empty database
    seed_initial_admin(&db, &app_config).await?;

    // 6. Run periodic reconciliation until interrupted. No gateway is wired
    //    in yet, so records accumulate locally and drains are no-ops.
    let reconciler = Arc::new(Reconciler::new(&app_config));
    let worker = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        let db = db.clone();
        async move { reconciler.run_periodic(&db, &OfflineGateway).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    reconciler.shutdown();
    worker.abort();

    Ok(())
}

/// Creates an `admin` user from `AJO_ADMIN_PASSWORD` when the users table is
/// empty, so a fresh install has a way in. Existing databases are untouched.
async fn seed_initial_admin(db: &DatabaseConnection, config: &config::AppConfig) -> Result<()> {
    if User::find().count(db).await? > 0 {
        return Ok(());
    }
    match env::var("AJO_ADMIN_PASSWORD") {
        Ok(password) => {
            user::create_user(
                db,
                config,
                "admin",
                &password,
                UserRole::Admin,
                UserProfile::default(),
            )
            .await?;
            info!("Seeded initial admin account");
        }
        Err(_) => {
            warn!("Empty database and AJO_ADMIN_PASSWORD not set; no admin account created");
        }
    }
    Ok(())
}
