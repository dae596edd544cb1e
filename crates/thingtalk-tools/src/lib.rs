//! ThingTalk Tools
//!
//! CLI tools for working with ThingTalk programs.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info` for thingtalk crates and `warn` for others.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,thingtalk=info,thingtalk_resolve=info,thingtalk_tools=debug")
    });

    // logs go to stderr so that stdout stays machine-readable
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
