// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bridge to forward logs from the `log` crate to a [`Logger`].
//!
//! `log` levels map onto severities as follows:
//!
//! - `Error` and `Warn` become [`Severity::Error`]
//! - `Info`, `Debug` and `Trace` become [`Severity::Debug`]
//!
//! The record's module path stands in for the function name.

use std::sync::Arc;

use crate::CallSite;
use crate::Logger;
use crate::Severity;

#[derive(Debug)]
struct LogCrateLogger(Arc<Logger>);

impl log::Log for LogCrateLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.0.enabled(severity_of(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let severity = severity_of(record.level());
        if !self.0.enabled(severity) {
            return;
        }

        let callsite = CallSite::from_parts(record.file(), record.line(), record.module_path());
        self.0.log(severity, callsite, *record.args());
    }

    fn flush(&self) {
        self.0.flush();
    }
}

fn severity_of(level: log::Level) -> Severity {
    match level {
        log::Level::Error | log::Level::Warn => Severity::Error,
        log::Level::Info | log::Level::Debug | log::Level::Trace => Severity::Debug,
    }
}

fn level_filter(min_level: Severity) -> log::LevelFilter {
    match min_level {
        Severity::All | Severity::Debug => log::LevelFilter::Trace,
        Severity::Error => log::LevelFilter::Warn,
        Severity::Key | Severity::Off => log::LevelFilter::Off,
    }
}

/// Set up the log crate global logger.
///
/// This function calls [`log::set_boxed_logger`] so that all logs from the log crate are
/// forwarded to `logger`, and sets the global maximum level to the most verbose level that
/// `logger` still writes.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = tierlog::WriterConfig::builder(dir.path(), "app").build().unwrap();
/// let logger = Arc::new(tierlog::Logger::new(config));
///
/// if let Err(err) = tierlog::bridge::try_setup_log_crate(logger.clone()) {
///     eprintln!("failed to setup log crate: {err}");
/// }
/// log::warn!("disk almost full");
/// ```
pub fn try_setup_log_crate(logger: Arc<Logger>) -> Result<(), log::SetLoggerError> {
    let max_level = level_filter(logger.config().min_level());
    log::set_boxed_logger(Box::new(LogCrateLogger(logger)))?;
    log::set_max_level(max_level);
    Ok(())
}

/// Set up the log crate global logger.
///
/// See [`try_setup_log_crate`].
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
pub fn setup_log_crate(logger: Arc<Logger>) {
    try_setup_log_crate(logger).expect(
        "tierlog::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(severity_of(log::Level::Error), Severity::Error);
        assert_eq!(severity_of(log::Level::Warn), Severity::Error);
        assert_eq!(severity_of(log::Level::Info), Severity::Debug);
        assert_eq!(severity_of(log::Level::Trace), Severity::Debug);

        assert_eq!(level_filter(Severity::Debug), log::LevelFilter::Trace);
        assert_eq!(level_filter(Severity::Error), log::LevelFilter::Warn);
        assert_eq!(level_filter(Severity::Key), log::LevelFilter::Off);
    }
}
