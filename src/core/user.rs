//! User management and authentication.
//!
//! Authorization state is carried in an explicit [`Session`] value built from
//! an authenticated user and passed into operations that require it - there
//! is no process-wide "current admin".

use crate::{
    auth,
    config::AppConfig,
    entities::{User, user, user::UserRole},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*};
use tracing::{info, warn};

/// Optional profile fields captured at registration.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// An authenticated caller, passed explicitly into operations that require
/// authorization.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl Session {
    /// Fails with [`Error::Forbidden`] unless the session's user is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.role == UserRole::Admin {
            Ok(())
        } else {
            Err(Error::Forbidden {
                username: self.username.clone(),
            })
        }
    }
}

impl From<&user::Model> for Session {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Registers a new user. The password is hashed before storage; the raw
/// password never touches the database.
///
/// # Errors
/// `DuplicateKey` if the username is taken, `Validation` for an empty
/// username or a password shorter than the configured minimum.
pub async fn create_user(
    db: &DatabaseConnection,
    config: &AppConfig,
    username: &str,
    password: &str,
    role: UserRole,
    profile: UserProfile,
) -> Result<user::Model> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::Validation {
            message: "username cannot be empty".to_string(),
        });
    }
    if password.len() < config.min_password_length {
        return Err(Error::Validation {
            message: format!(
                "password must be at least {} characters",
                config.min_password_length
            ),
        });
    }

    let password_hash = auth::hash_password(password)?;
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        role: Set(role),
        full_name: Set(profile.full_name),
        phone_number: Set(profile.phone_number),
        email: Set(profile.email),
        created_at: Set(chrono::Utc::now()),
        last_login: Set(None),
        is_active: Set(true),
        login_attempts: Set(0),
        ..Default::default()
    };

    match user.insert(db).await {
        Ok(model) => {
            info!("Created user '{}' with role {}", model.username, model.role);
            Ok(model)
        }
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Err(Error::DuplicateKey {
                entity: "user",
                key: username.to_string(),
            }),
            _ => Err(e.into()),
        },
    }
}

/// Authenticates a user by username and password.
///
/// Failure always surfaces as [`Error::InvalidCredentials`], whether the
/// username is unknown, the password is wrong, or the user is deactivated -
/// distinguishing them would allow username enumeration. On failure
/// `login_attempts` is incremented for the username (if it exists); success
/// resets it and stamps `last_login`.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model> {
    let user = User::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?;

    if let Some(found) = user {
        if auth::verify_password(password, &found.password_hash)? {
            let mut active: user::ActiveModel = found.into();
            active.login_attempts = Set(0);
            active.last_login = Set(Some(chrono::Utc::now()));
            let updated = active.update(db).await?;
            info!("User '{}' authenticated", updated.username);
            return Ok(updated);
        }
    }

    // Atomic increment; a no-op when the username does not exist, so the
    // caller learns nothing about which part failed.
    use sea_orm::sea_query::Expr;
    User::update_many()
        .col_expr(
            user::Column::LoginAttempts,
            Expr::col(user::Column::LoginAttempts).add(1),
        )
        .filter(user::Column::Username.eq(username))
        .exec(db)
        .await?;

    warn!("Authentication failed");
    Err(Error::InvalidCredentials)
}

/// Finds a user by id, active or not.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Lists all users, newest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes a user's role. Admin-only.
pub async fn update_user_role(
    db: &DatabaseConnection,
    session: &Session,
    user_id: i64,
    role: UserRole,
) -> Result<user::Model> {
    session.require_admin()?;
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
    let mut active: user::ActiveModel = user.into();
    active.role = Set(role);
    let updated = active.update(db).await?;
    info!("Updated user {} role to {}", updated.id, updated.role);
    Ok(updated)
}

/// Soft-deletes a user: sets `is_active = false`, which excludes them from
/// authentication while preserving financial history. Admin-only.
pub async fn deactivate_user(
    db: &DatabaseConnection,
    session: &Session,
    user_id: i64,
) -> Result<()> {
    session.require_admin()?;
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(false);
    active.update(db).await?;
    info!("Deactivated user {user_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_and_authenticate() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let created = create_user(
            &db,
            &config,
            "alice",
            "correct-horse",
            UserRole::User,
            UserProfile::default(),
        )
        .await?;
        assert_eq!(created.username, "alice");
        assert_eq!(created.login_attempts, 0);
        assert!(created.last_login.is_none());

        let authed = authenticate(&db, "alice", "correct-horse").await?;
        assert_eq!(authed.id, created.id);
        assert!(authed.last_login.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        create_test_user(&db, &config, "alice").await?;
        let result = create_user(
            &db,
            &config,
            "alice",
            "another-pass",
            UserRole::User,
            UserProfile::default(),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicateKey { entity: "user", .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_validation_rejections() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let empty_name = create_user(
            &db,
            &config,
            "   ",
            "long-enough",
            UserRole::User,
            UserProfile::default(),
        )
        .await;
        assert!(matches!(empty_name.unwrap_err(), Error::Validation { .. }));

        let short_password = create_user(
            &db,
            &config,
            "bob",
            "abc",
            UserRole::User,
            UserProfile::default(),
        )
        .await;
        assert!(matches!(
            short_password.unwrap_err(),
            Error::Validation { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_auth_increments_attempts() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let user = create_test_user(&db, &config, "alice").await?;

        let result = authenticate(&db, "alice", "wrong-password").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidCredentials));

        let reloaded = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(reloaded.login_attempts, 1);

        // Success resets the counter
        authenticate(&db, "alice", TEST_PASSWORD).await?;
        let reloaded = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(reloaded.login_attempts, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_username_same_error() -> Result<()> {
        let (db, _config) = setup_test_env().await?;
        let result = authenticate(&db, "nobody", "whatever").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidCredentials));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivated_user_cannot_authenticate() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let admin = create_test_admin(&db, &config, "root").await?;
        let user = create_test_user(&db, &config, "alice").await?;

        deactivate_user(&db, &Session::from(&admin), user.id).await?;
        let result = authenticate(&db, "alice", TEST_PASSWORD).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidCredentials));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_admin_cannot_manage_users() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let user = create_test_user(&db, &config, "alice").await?;
        let other = create_test_user(&db, &config, "bob").await?;

        let session = Session::from(&user);
        let result = update_user_role(&db, &session, other.id, UserRole::Admin).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));

        let result = deactivate_user(&db, &session, other.id).await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_role() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let admin = create_test_admin(&db, &config, "root").await?;
        let user = create_test_user(&db, &config, "alice").await?;

        let updated =
            update_user_role(&db, &Session::from(&admin), user.id, UserRole::Admin).await?;
        assert_eq!(updated.role, UserRole::Admin);
        Ok(())
    }

    #[tokio::test]
    async fn test_password_not_stored_in_clear() -> Result<()> {
        let (db, config) = setup_test_env().await?;
        let user = create_test_user(&db, &config, "alice").await?;
        assert_ne!(user.password_hash, TEST_PASSWORD);
        assert!(user.password_hash.starts_with("$argon2id$"));
        Ok(())
    }
}
