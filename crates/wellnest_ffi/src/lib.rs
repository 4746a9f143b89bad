//! Flutter-facing bindings for WellNest core.

pub mod api;
