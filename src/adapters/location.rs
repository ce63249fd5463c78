//! Location source adapters for simulation and tests.

use std::sync::{Mutex, PoisonError};

use crate::app::ports::LocationSource;
use crate::geo::Position;

/// Always reports the same fix (or none).
pub struct FixedLocation {
    fix: Mutex<Option<Position>>,
}

impl FixedLocation {
    pub fn new(fix: Option<Position>) -> Self {
        Self {
            fix: Mutex::new(fix),
        }
    }

    pub fn set(&self, fix: Option<Position>) {
        *self.fix.lock().unwrap_or_else(PoisonError::into_inner) = fix;
    }
}

impl LocationSource for FixedLocation {
    fn last_known_position(&self) -> Option<Position> {
        *self.fix.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Replays a recorded route, one step per query.  The last step repeats
/// once the route is exhausted.
pub struct RouteLocation {
    inner: Mutex<RouteInner>,
}

struct RouteInner {
    steps: Vec<Option<Position>>,
    next: usize,
}

impl RouteLocation {
    pub fn new(steps: Vec<Option<Position>>) -> Self {
        Self {
            inner: Mutex::new(RouteInner { steps, next: 0 }),
        }
    }

    /// Number of queries served so far.
    pub fn served(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).next
    }
}

impl LocationSource for RouteLocation {
    fn last_known_position(&self) -> Option<Position> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let last = inner.steps.len().checked_sub(1)?;
        let fix = inner.steps[inner.next.min(last)];
        inner.next += 1;
        fix
    }
}
