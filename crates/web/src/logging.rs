//! Default `tracing` subscriber for hosts that don't install their own.

use once_cell::sync::OnceCell;
use tracing::{Level, warn};
use tracing_subscriber::FmtSubscriber;

use crate::debug;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Sets the debug flag and installs a formatting subscriber, `DEBUG` level
/// when `debug` is set and `INFO` otherwise.
///
/// Only the first call installs a subscriber; later calls just update the
/// debug flag. If the host already installed a global subscriber, that one
/// is kept.
pub fn init(debug: bool) {
    debug::set_enabled(debug);

    INSTALLED.get_or_init(|| {
        let level = if debug { Level::DEBUG } else { Level::INFO };
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "keep the existing global subscriber");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_only_updates_the_flag() {
        init(false);
        assert!(!debug::enabled());

        init(true);
        assert!(debug::enabled());

        debug::set_enabled(false);
    }
}
