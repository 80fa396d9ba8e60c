//! Key-value settings store.
//!
//! Holds operational state the application wants to survive restarts:
//! cached exchange rates, the last known gateway balance, sync bookkeeping.

use crate::{
    entities::{Setting, setting},
    errors::Result,
};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};

/// Reads a setting, or `None` if it was never written.
pub async fn get_setting(db: &DatabaseConnection, key: &str) -> Result<Option<String>> {
    Ok(Setting::find_by_id(key)
        .one(db)
        .await?
        .map(|setting| setting.value))
}

/// Writes a setting, replacing any previous value.
pub async fn set_setting(db: &DatabaseConnection, key: &str, value: &str) -> Result<()> {
    let row = setting::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value.to_string()),
        updated_at: Set(chrono::Utc::now()),
    };
    // exec_without_returning: the string primary key cannot be read back
    // through last_insert_id.
    Setting::insert(row)
        .on_conflict(
            OnConflict::column(setting::Column::Key)
                .update_columns([setting::Column::Value, setting::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}
