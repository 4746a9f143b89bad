//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `wellnest_core` linkage.
//! - Print the default goal capacity policy against a fresh in-memory store.

use wellnest_core::policy::capacity::DraftOrigin;
use wellnest_core::{open_db_in_memory, CoreConfig, GoalRepository, GoalStatus, SqliteGoalRepository};

fn main() {
    println!("wellnest_core ping={}", wellnest_core::ping());
    println!("wellnest_core version={}", wellnest_core::core_version());

    let config = CoreConfig::default();
    let policy = match config.capacity_policy() {
        Ok(policy) => policy,
        Err(err) => {
            eprintln!("wellnest_core policy error={err}");
            std::process::exit(1);
        }
    };
    println!(
        "wellnest_core policy limit={} enforcement={}",
        policy.limit(),
        policy.enforcement().as_str()
    );

    let active_count = match open_db_in_memory()
        .map_err(|err| err.to_string())
        .and_then(|conn| {
            let repo = SqliteGoalRepository::try_new(&conn).map_err(|err| err.to_string())?;
            repo.count_active().map_err(|err| err.to_string())
        }) {
        Ok(count) => count,
        Err(err) => {
            eprintln!("wellnest_core db error={err}");
            std::process::exit(1);
        }
    };
    let assessment = policy.assess(active_count, GoalStatus::Active, DraftOrigin::New);
    println!("wellnest_core caption={}", assessment.caption);
}
