//! quillpress CLI Library
//!
//! Command implementations and watch scheduling for the quillpress static
//! site generator. The binary entry point lives in `main.rs`.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, watch)
//! - [`watch`] - Debounced rebuild scheduling
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use quillpress::cmd;
//!
//! let options = cmd::build_options(None, Path::new("."), None, false).unwrap();
//! cmd::build::run(&options).unwrap();
//! ```

pub mod cmd;
pub mod watch;

pub use quillpress_core::Config;
pub use quillpress_generator::{BuildOptions, BuildStats, generate};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
