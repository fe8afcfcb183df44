use log::error;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static SUPPRESS_EXIT: Cell<bool> = const { Cell::new(false) };
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown payload"
    }
}

/// Installs the process panic hook: pretty backtraces in debug builds, a crash report in
/// release builds, then exit with status 1. Panics inside [`with_panic_exit_suppressed`]
/// are only logged.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();
    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!(Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let suppress = SUPPRESS_EXIT.with(|flag| flag.get());
        if suppress {
            error!("Suppressed panic: {}", payload_message(panic_info.payload()));
            return;
        }

        error!("Fatal panic: {}", payload_message(panic_info.payload()));
        default_hook(panic_info);
        std::process::exit(1);
    }));
}

pub fn with_panic_exit_suppressed<F, T>(f: F) -> T
where
    F: FnOnce() -> T,
{
    struct ExitGuard(bool);
    impl Drop for ExitGuard {
        fn drop(&mut self) {
            SUPPRESS_EXIT.with(|flag| flag.set(self.0));
        }
    }

    let previous = SUPPRESS_EXIT.with(|flag| {
        let prev = flag.get();
        flag.set(true);
        prev
    });
    let guard = ExitGuard(previous);
    let result = f();
    drop(guard);
    result
}

/// Runs an optional pipeline step. A panic is logged against `step` and yields `None`.
pub fn run_isolated<F, T>(step: &str, f: F) -> Option<T>
where
    F: FnOnce() -> T,
{
    with_panic_exit_suppressed(|| panic::catch_unwind(AssertUnwindSafe(f))).map_or_else(
        |payload| {
            error!("Step '{step}' failed: {}", payload_message(payload.as_ref()));
            None
        },
        Some,
    )
}

#[cfg(not(debug_assertions))]
use human_panic::Metadata;
