//! Domain model for goals and quick-capture todos.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Records validate themselves before any persistence write.

pub mod goal;
pub mod todo;
