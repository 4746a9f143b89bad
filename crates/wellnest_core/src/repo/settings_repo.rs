//! Settings key-value repository.
//!
//! Plain string keys and values; typed interpretation lives in `config`.

use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for the settings key-value store.
pub trait SettingsRepository {
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>>;
    /// Inserts or replaces one value.
    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get_setting(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingsRepository, SqliteSettingsRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn set_setting_overwrites_existing_value() {
        let conn = open_db_in_memory().expect("open db");
        let repo = SqliteSettingsRepository::try_new(&conn).expect("repo");

        assert_eq!(repo.get_setting("goals.active_limit").expect("get"), None);
        repo.set_setting("goals.active_limit", "2").expect("set");
        repo.set_setting("goals.active_limit", "3").expect("overwrite");
        assert_eq!(
            repo.get_setting("goals.active_limit").expect("get").as_deref(),
            Some("3")
        );
    }
}
