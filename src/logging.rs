//! Structured logging setup.
//!
//! Mirrors the teacher's `mc_common::logger` facade (`create_app_logger`,
//! `log::debug!(logger, "..."; "key" => value)`, per-component child loggers
//! via `logger.new(o!(...))`) directly against `slog`, since `mc_common`
//! itself is not a crate we can depend on here.

use slog::{o, Drain};

/// Build the process-wide root logger. The returned `Logger` owns the async
/// worker thread (via the fused `slog_async::Async` drain); dropping the last
/// clone joins it and flushes any buffered records.
pub fn create_app_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}
