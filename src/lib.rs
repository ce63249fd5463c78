//! Zonewatch geofence library.
//!
//! Exposes the proximity engine, the adaptive scheduler and the
//! hexagonal port/adapter layers for integration testing and for the
//! host simulation binary.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geo;
pub mod proximity;
pub mod scheduler;
pub mod zone;

pub use error::{Error, Result};
