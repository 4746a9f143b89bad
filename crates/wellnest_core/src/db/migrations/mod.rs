//! Schema steps for the WellNest store.
//!
//! Each step owns the tables it creates. The store version lives in
//! `PRAGMA user_version` and only moves forward.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
    tables: &'static [&'static str],
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "goals",
        sql: include_str!("0001_goals.sql"),
        tables: &["goals"],
    },
    SchemaStep {
        version: 2,
        name: "todos",
        sql: include_str!("0002_todos.sql"),
        tables: &["todos"],
    },
    SchemaStep {
        version: 3,
        name: "settings",
        sql: include_str!("0003_settings.sql"),
        tables: &["settings"],
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Every table the repositories expect, in creation order.
pub fn schema_tables() -> impl Iterator<Item = &'static str> {
    STEPS.iter().flat_map(|step| step.tables.iter().copied())
}

/// Brings `conn` to `latest_version()` in one transaction, then checks that
/// the goals, todos and settings tables all exist.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = stored_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::SchemaTooNew {
            db_version: from,
            latest_supported: latest,
        });
    }

    if from < latest {
        let tx = conn.transaction()?;
        for step in STEPS.iter().filter(|step| step.version > from) {
            tx.execute_batch(step.sql)
                .map_err(|source| DbError::Migration {
                    version: step.version,
                    name: step.name,
                    source,
                })?;
            tx.pragma_update(None, "user_version", step.version)?;
            debug!(
                "event=db_migrate module=db status=applied version={} name={}",
                step.version, step.name
            );
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            from, latest
        );
    }

    verify_tables(conn)
}

fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    let mut lookup =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;")?;
    for table in schema_tables() {
        if !lookup.exists([table])? {
            return Err(DbError::MissingTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, schema_tables, STEPS};

    #[test]
    fn steps_are_ordered_and_each_owns_a_table() {
        let mut previous = 0;
        for step in STEPS {
            assert!(step.version > previous, "{} is out of order", step.name);
            assert!(!step.tables.is_empty(), "{} creates no table", step.name);
            previous = step.version;
        }
        assert_eq!(latest_version(), previous);
    }

    #[test]
    fn schema_covers_goals_todos_and_settings() {
        let tables: Vec<_> = schema_tables().collect();
        assert_eq!(tables, vec!["goals", "todos", "settings"]);
    }
}
