//! Application core: the check cycle and its port boundary.
//!
//! This module contains the orchestration of one geofence check: the
//! permission and settings preconditions, the position fix, gating, the
//! proximity engine and the action sink.  All interaction with the
//! platform happens through **port traits** defined in [`ports`].

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
