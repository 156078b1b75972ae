use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static QUIET_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Suppresses regular status lines. Debug output and errors are unaffected.
pub fn set_quiet(enabled: bool) {
    QUIET_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET_ENABLED.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! status_println {
    ($($arg:tt)*) => {
        if !$crate::debug::is_quiet() {
            println!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            println!("[debug] {}", format!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[debug] {}", format!($($arg)*));
        }
    };
}
