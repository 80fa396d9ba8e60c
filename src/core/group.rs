//! Savings group and membership management.
//!
//! Groups and memberships are only ever soft-deleted: financial history
//! hangs off groups, and deleting a group must never cascade into it.

use crate::{
    entities::{Group, GroupMembership, User, group, group_membership, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, SqlErr, prelude::*};
use std::collections::HashMap;
use tracing::info;

/// A group with its aggregate member count, as shown in listings.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub group: group::Model,
    /// Full name of the administering user, if resolvable
    pub admin_name: Option<String>,
    /// Number of active memberships
    pub member_count: i64,
}

/// Creates a new savings group.
///
/// # Errors
/// `DuplicateKey` if the name is taken, `Validation` for an empty name.
pub async fn create_group(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
    admin_user_id: Option<i64>,
) -> Result<group::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "group name cannot be empty".to_string(),
        });
    }

    let group = group::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description),
        admin_user_id: Set(admin_user_id),
        created_at: Set(chrono::Utc::now()),
        is_active: Set(true),
        ..Default::default()
    };

    match group.insert(db).await {
        Ok(model) => {
            info!("Created group '{}'", model.name);
            Ok(model)
        }
        Err(e) => match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Err(Error::DuplicateKey {
                entity: "group",
                key: name.to_string(),
            }),
            _ => Err(e.into()),
        },
    }
}

/// Finds an active group by id.
pub async fn get_active_group(db: &DatabaseConnection, group_id: i64) -> Result<group::Model> {
    Group::find_by_id(group_id)
        .filter(group::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "group",
            id: group_id.to_string(),
        })
}

/// Soft-deletes a group. Contributions, payouts and commissions recorded
/// against it are untouched.
pub async fn delete_group(db: &DatabaseConnection, group_id: i64) -> Result<()> {
    let group = get_active_group(db, group_id).await?;
    let mut active: group::ActiveModel = group.into();
    active.is_active = Set(false);
    active.update(db).await?;
    info!("Soft-deleted group {group_id}");
    Ok(())
}

/// Adds a user to a group.
///
/// A previously-removed membership is reactivated in place, preserving the
/// original `joined_at`. Adding a user who is already an active member fails
/// with `DuplicateKey`.
pub async fn add_user_to_group(
    db: &DatabaseConnection,
    user_id: i64,
    group_id: i64,
) -> Result<group_membership::Model> {
    // Both sides must exist and be active
    get_active_group(db, group_id).await?;
    let user = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

    let existing = GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    match existing {
        Some(membership) if membership.is_active => Err(Error::DuplicateKey {
            entity: "group membership",
            key: format!("user {user_id} in group {group_id}"),
        }),
        Some(membership) => {
            let mut active: group_membership::ActiveModel = membership.into();
            active.is_active = Set(true);
            let reactivated = active.update(db).await?;
            info!("Reactivated membership of user {user_id} in group {group_id}");
            Ok(reactivated)
        }
        None => {
            let membership = group_membership::ActiveModel {
                group_id: Set(group_id),
                user_id: Set(user_id),
                joined_at: Set(chrono::Utc::now()),
                is_active: Set(true),
                ..Default::default()
            };
            let created = membership.insert(db).await?;
            info!("Added user '{}' to group {group_id}", user.username);
            Ok(created)
        }
    }
}

/// Removes a user from a group by soft-deleting the membership row.
pub async fn remove_user_from_group(
    db: &DatabaseConnection,
    user_id: i64,
    group_id: i64,
) -> Result<()> {
    let membership = GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .filter(group_membership::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "group membership",
            id: format!("user {user_id} in group {group_id}"),
        })?;

    let mut active: group_membership::ActiveModel = membership.into();
    active.is_active = Set(false);
    active.update(db).await?;
    info!("Removed user {user_id} from group {group_id}");
    Ok(())
}

/// Lists all active groups with their active member counts, newest first.
pub async fn list_active_groups(db: &DatabaseConnection) -> Result<Vec<GroupSummary>> {
    let groups = Group::find()
        .filter(group::Column::IsActive.eq(true))
        .order_by_desc(group::Column::CreatedAt)
        .all(db)
        .await?;

    // Member counts in one grouped query, merged in memory
    let counts: Vec<(i64, i64)> = GroupMembership::find()
        .select_only()
        .column(group_membership::Column::GroupId)
        .column_as(group_membership::Column::Id.count(), "member_count")
        .filter(group_membership::Column::IsActive.eq(true))
        .group_by(group_membership::Column::GroupId)
        .into_tuple()
        .all(db)
        .await?;
    let counts: HashMap<i64, i64> = counts.into_iter().collect();

    let admin_ids: Vec<i64> = groups.iter().filter_map(|g| g.admin_user_id).collect();
    let admins: HashMap<i64, Option<String>> = if admin_ids.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(admin_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name))
            .collect()
    };

    Ok(groups
        .into_iter()
        .map(|group| {
            let member_count = counts.get(&group.id).copied().unwrap_or(0);
            let admin_name = group
                .admin_user_id
                .and_then(|id| admins.get(&id).cloned())
                .flatten();
            GroupSummary {
                group,
                admin_name,
                member_count,
            }
        })
        .collect())
}

/// Lists the active members of a group.
pub async fn list_group_members(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<user::Model>> {
    let memberships = GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::IsActive.eq(true))
        .all(db)
        .await?;
    let user_ids: Vec<i64> = memberships.into_iter().map(|m| m.user_id).collect();
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }
    User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(Into::into)
}
