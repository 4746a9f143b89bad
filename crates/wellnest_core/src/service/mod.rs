//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and policies into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod goal_service;
pub mod todo_service;
