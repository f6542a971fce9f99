/// Prefixed status line, emitted as a `tracing` info event.
///
/// Usage:
/// ```ignore
/// log_status!("fetch", "Cloning {} at {}", url, reference);
/// log_status!("policy", "No runtime dependency on binwrap");
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        $crate::__tracing::info!(
            target: "morphir_build::status",
            scope = $prefix,
            "[{}] {}",
            $prefix,
            format_args!($($arg)*)
        )
    };
}

#[doc(hidden)]
pub use tracing as __tracing;

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `morphir_build::engine` instead of `morphir_build::core::engine`
pub use self::core::*;
pub use self::utils::*;
