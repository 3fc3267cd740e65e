//! Logging backend setup and the per-session log sink.
//!
//! The process-wide backend is `env_logger`, installed once by [`init_logger`].
//! Sessions never reach for the global logger themselves: they are handed a
//! [`LogSink`], which decides which levels are visible for that connection and
//! where the lines go.

use std::fmt;

use log::{Level, LevelFilter};

/// Installs `env_logger` as the global logger.
///
/// The base level is `Info`; `debug` raises it to `Debug` and `verbose` to
/// `Trace`. `RUST_LOG` still applies on top of this.
pub fn init_logger(debug: bool, verbose: bool) {
    env_logger::Builder::from_default_env()
        .filter_level(level_filter(debug, verbose))
        .format_target(false)
        .init();
}

/// Maps the debug/verbose switches onto a level filter. Verbose implies debug.
pub fn level_filter(debug: bool, verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Trace
    } else if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Destination for everything a session reports.
pub trait LogSink: Send + Sync {
    /// Whether lines at `level` would be emitted at all. Callers use this to
    /// skip building expensive payload dumps.
    fn enabled(&self, level: Level) -> bool;

    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        if self.enabled(Level::Debug) {
            self.log(Level::Debug, args)
        }
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        if self.enabled(Level::Trace) {
            self.log(Level::Trace, args)
        }
    }
}

/// Default sink: forwards to the `log` facade, prefixing every line with the
/// connection number.
#[derive(Debug, Clone)]
pub struct ConnectionLogger {
    prefix: String,
    debug: bool,
    verbose: bool,
}

impl ConnectionLogger {
    pub fn new(connection_id: u64, debug: bool, verbose: bool) -> Self {
        Self {
            prefix: format!("Connection #{:03} ", connection_id),
            debug,
            verbose,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl LogSink for ConnectionLogger {
    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Error | Level::Warn | Level::Info => true,
            Level::Debug => self.debug || self.verbose,
            Level::Trace => self.verbose,
        }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(level, "{}{}", self.prefix, args);
        }
    }
}

/// Sink without a connection prefix, for process-level reporting such as
/// pattern matches. Visibility follows the global level filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLogger;

impl LogSink for ProcessLogger {
    fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(level)
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(level, "{}", args);
    }
}
