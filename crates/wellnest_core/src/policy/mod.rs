//! Rule-governed product policies.
//!
//! Policies are pure decision functions; services feed them freshly read
//! state and act on the result.

pub mod capacity;
