//! Goal repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and counting APIs over the `goals` table.
//! - Serve the authoritative active-goal count read by the capacity policy.
//!
//! # Invariants
//! - Write paths call `Goal::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `count_active` always hits storage; nothing is cached here.

use crate::model::goal::{Goal, GoalId, GoalStatus};
use crate::repo::{
    ensure_connection_ready, parse_date, parse_uuid, RepoError, RepoResult, DATE_FORMAT,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    title,
    status,
    category,
    target_date,
    progress,
    created_at,
    updated_at
FROM goals";

/// Query options for listing goals.
#[derive(Debug, Clone, Default)]
pub struct GoalListQuery {
    pub status: Option<GoalStatus>,
    pub category: Option<String>,
}

/// Repository interface for goal persistence.
pub trait GoalRepository {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId>;
    fn update_goal(&self, goal: &Goal) -> RepoResult<()>;
    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>>;
    fn list_goals(&self, query: &GoalListQuery) -> RepoResult<Vec<Goal>>;
    /// Number of goals with `status = active` at call time.
    fn count_active(&self) -> RepoResult<u32>;
    /// Hard-deletes one goal. Callers confirm with the user first.
    fn delete_goal(&self, id: GoalId) -> RepoResult<()>;
}

/// SQLite-backed goal repository.
pub struct SqliteGoalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoalRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GoalRepository for SqliteGoalRepository<'_> {
    fn create_goal(&self, goal: &Goal) -> RepoResult<GoalId> {
        goal.validate()?;

        self.conn.execute(
            "INSERT INTO goals (
                id,
                title,
                status,
                category,
                target_date,
                progress
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                goal.id.to_string(),
                goal.title.trim(),
                goal.status.as_str(),
                goal.category.trim(),
                goal.target_date
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                i64::from(goal.progress),
            ],
        )?;

        Ok(goal.id)
    }

    fn update_goal(&self, goal: &Goal) -> RepoResult<()> {
        goal.validate()?;

        let changed = self.conn.execute(
            "UPDATE goals
             SET
                title = ?1,
                status = ?2,
                category = ?3,
                target_date = ?4,
                progress = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6;",
            params![
                goal.title.trim(),
                goal.status.as_str(),
                goal.category.trim(),
                goal.target_date
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                i64::from(goal.progress),
                goal.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(goal.id));
        }

        Ok(())
    }

    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GOAL_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_goal_row(row)?));
        }

        Ok(None)
    }

    fn list_goals(&self, query: &GoalListQuery) -> RepoResult<Vec<Goal>> {
        let mut sql = format!("{GOAL_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND category = ? COLLATE NOCASE");
            bind_values.push(Value::Text(category.trim().to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut goals = Vec::new();

        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }

        Ok(goals)
    }

    fn count_active(&self) -> RepoResult<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM goals WHERE status = ?1;",
            [GoalStatus::Active.as_str()],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }

    fn delete_goal(&self, id: GoalId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<Goal> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "goals.id")?;

    let status_text: String = row.get("status")?;
    let status = GoalStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid goal status `{status_text}` in goals.status"))
    })?;

    let progress_value: i64 = row.get("progress")?;
    let progress = u8::try_from(progress_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid progress `{progress_value}` in goals.progress"
        ))
    })?;

    let goal = Goal {
        id,
        title: row.get("title")?,
        status,
        category: row.get("category")?,
        target_date: parse_date(row.get("target_date")?, "goals.target_date")?,
        progress,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    goal.validate()?;
    Ok(goal)
}
