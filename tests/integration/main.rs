//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! the mock ports in `mock_ports`.  Time is virtual throughout; no test
//! here sleeps for a schedule interval.

mod cycle_tests;
mod mock_ports;
mod scheduler_tests;
