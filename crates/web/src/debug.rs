//! The process-wide debug flag.
//!
//! When set, handlers log per-request diagnostics (asset resolution,
//! dispatch) at `DEBUG` level. It never changes what is sent to clients.

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

#[inline]
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}
