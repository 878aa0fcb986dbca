//! Application-level orchestration.
//!
//! This module owns the refresh cycle lifecycle (launch, manual refresh, polling, stop).
//! UI/CLI layers send commands in and render the cycle outcomes they receive back.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
