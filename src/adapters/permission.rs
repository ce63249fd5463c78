//! Permission adapter backed by a flag the embedding app flips.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::PermissionPort;

pub struct StaticPermission {
    granted: AtomicBool,
}

impl StaticPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }
}

impl PermissionPort for StaticPermission {
    fn has_location_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}
