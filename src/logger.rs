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

use std::fmt;
use std::fs;
use std::io;
use std::io::Write;
use std::sync::Arc;

use crate::CallSite;
use crate::Error;
use crate::Severity;
use crate::WriterConfig;
use crate::WriterStatus;
use crate::clock::Clock;
use crate::layout;
use crate::monitor;
use crate::monitor::MonitorGuard;
use crate::monitor::RotationMonitor;
use crate::registry::Registry;
use crate::writer::FileWriter;

/// The entry point of all logging: gates, formats and cascades lines into the tier files.
///
/// A line of severity `S` is written to the file of `S` and then to the file of every lower
/// configured severity, so the lowest tier's file holds everything.
///
/// # Examples
///
/// ```
/// use tierlog::Logger;
/// use tierlog::Severity;
/// use tierlog::WriterConfig;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = WriterConfig::builder(dir.path(), "app")
///     .min_level(Severity::Debug)
///     .rollover_daily()
///     .build()
///     .unwrap();
/// let logger = Logger::new(config);
///
/// tierlog::key!(logger, "order {} accepted", 42);
/// tierlog::debug_line!(logger, "cache", "warm");
///
/// let key = std::fs::read_to_string(dir.path().join("app_key.log")).unwrap();
/// assert!(key.contains("EM:order 42 accepted"));
/// ```
#[derive(Debug)]
pub struct Logger {
    config: WriterConfig,
    registry: Arc<Registry>,
    clock: Clock,
    pid: u32,
    monitor: Option<MonitorGuard>,
}

impl Logger {
    /// Create a logger and, unless disabled, start its rotation monitor.
    ///
    /// Files are opened lazily on the first write. A log directory that cannot be created is
    /// reported to the configured trap; the logger is still usable and retries on every write.
    pub fn new(config: WriterConfig) -> Logger {
        Logger::with_clock(config, Clock::DefaultClock)
    }

    pub(crate) fn with_clock(config: WriterConfig, clock: Clock) -> Logger {
        if let Err(err) = fs::create_dir_all(config.dir()) {
            let err = Error::new("failed to create log directory")
                .with_context("dir", config.dir().display())
                .with_source(err);
            config.trap().trap(&err);
        }

        let registry = Arc::new(Registry::new(&config, &clock));
        let monitor = config.monitor_interval().and_then(|interval| {
            let trap = config.trap().clone();
            match RotationMonitor::spawn(registry.clone(), trap, interval) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    config.trap().trap(&err);
                    None
                }
            }
        });

        Logger {
            config,
            registry,
            clock,
            pid: std::process::id(),
            monitor,
        }
    }

    /// The configuration this logger was created with.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Whether a line of `severity` would be written anywhere.
    pub fn enabled(&self, severity: Severity) -> bool {
        severity != Severity::Off && severity >= self.config.min_level()
    }

    /// Write one line of `severity` to its tier and every lower tier.
    ///
    /// Usually called through [`debug!`](crate::debug!), [`error!`](crate::error!),
    /// [`key!`](crate::key!) or their `_line` variants, which skip formatting entirely when
    /// the severity is disabled.
    pub fn log(&self, severity: Severity, callsite: CallSite<'_>, args: fmt::Arguments<'_>) {
        if !self.enabled(severity) {
            return;
        }

        let now = self.clock.now();
        let line = layout::format_line(&now, self.pid, severity, &callsite, args);
        for writer in self.registry.cascade(severity) {
            writer.append(&line);
        }

        if self.config.console(severity) {
            self.echo(severity, &line);
        }
    }

    /// Write a banner marking the start of a request to the lowest tier's file.
    ///
    /// The banner is written regardless of severity gating.
    pub fn header(&self, callsite: CallSite<'_>) {
        let Some(writer) = self.registry.lowest() else {
            return;
        };
        let banner = layout::format_header(&self.clock.now(), &callsite);
        writer.append(&banner);
    }

    /// Run one rotation check over every writer right now, as the monitor does on each tick.
    pub fn check_rotation(&self) {
        monitor::check_all(&self.registry, self.config.trap().as_ref());
    }

    /// The state of the writer of `severity`, if that tier is configured.
    pub fn status(&self, severity: Severity) -> Option<WriterStatus> {
        self.registry.get(severity).map(FileWriter::status)
    }

    /// Flush every open file.
    pub fn flush(&self) {
        for writer in self.registry.iter() {
            writer.flush();
        }
    }

    /// Close every open file. Files are opened again by the next write.
    pub fn close(&self) {
        for writer in self.registry.iter() {
            writer.close();
        }
    }

    fn echo(&self, severity: Severity, line: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{}", paint(severity, line)) {
            let err = Error::new("failed to echo log line to stdout").with_source(err);
            self.config.trap().trap(&err);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        drop(self.monitor.take());
        self.flush();
    }
}

#[cfg(feature = "colored")]
fn paint(severity: Severity, line: &str) -> colored::ColoredString {
    use colored::Colorize;

    match severity {
        Severity::Error => line.red(),
        Severity::Key => line.green(),
        Severity::Debug => line.blue(),
        Severity::All | Severity::Off => line.normal(),
    }
}

#[cfg(not(feature = "colored"))]
fn paint(_: Severity, line: &str) -> &str {
    line
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::str::FromStr;

    use jiff::Zoned;
    use tempfile::TempDir;

    use super::*;
    use crate::clock::ManualClock;
    use crate::trap::testing::RecordingTrap;

    #[test]
    fn test_line_uses_clock_and_pid() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T08:00:00.5[UTC]").unwrap());
        let config = WriterConfig::builder(temp_dir.path(), "app")
            .min_level(Severity::Error)
            .rollover_daily()
            .without_monitor()
            .build()
            .unwrap();
        let logger = Logger::with_clock(config, Clock::ManualClock(clock));

        logger.log(
            Severity::Error,
            CallSite::new("src/job.rs", 7, "app::job::run"),
            format_args!("failed {}", 3),
        );

        let expected = format!(
            "[2024-08-10 08:00:00.500] [PID:{}] #ERR# FILE:job.rs LN:7 FUNC:run EM:failed 3\n",
            std::process::id()
        );
        let error = fs::read_to_string(temp_dir.path().join("app_error.log")).unwrap();
        assert_eq!(error, expected);
    }

    #[test]
    fn test_daily_rotation_across_midnight() {
        let temp_dir = TempDir::new().unwrap();
        let trap = RecordingTrap::default();
        let clock = ManualClock::new(Zoned::from_str("2024-08-10T23:59:59[UTC]").unwrap());
        let config = WriterConfig::builder(temp_dir.path(), "app")
            .rollover_daily()
            .without_monitor()
            .trap(trap.clone())
            .build()
            .unwrap();
        let logger = Logger::with_clock(config, Clock::ManualClock(clock.clone()));

        logger.log(Severity::Key, CallSite::unknown(), format_args!("before"));
        clock.set_now(Zoned::from_str("2024-08-11T00:00:00.001[UTC]").unwrap());
        logger.log(Severity::Key, CallSite::unknown(), format_args!("after"));

        for name in ["app_key.log", "app_error.log", "app_debug.log"] {
            let snapshot = temp_dir.path().join(format!("{name}.2024-08-10"));
            let snapshot = fs::read_to_string(snapshot).unwrap();
            assert!(snapshot.contains("EM:before"));
            assert!(!snapshot.contains("EM:after"));

            let active = fs::read_to_string(temp_dir.path().join(name)).unwrap();
            assert!(active.starts_with("[2024-08-11 00:00:00.001]"));
            assert!(active.contains("EM:after"));
            assert!(!active.contains("EM:before"));
        }
        assert!(trap.errors().is_empty());
    }

    #[test]
    fn test_unwritable_directory_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let trap = RecordingTrap::default();
        let config = WriterConfig::builder(blocker.join("logs"), "app")
            .without_monitor()
            .trap(trap.clone())
            .build()
            .unwrap();

        let logger = Logger::new(config);
        assert_eq!(trap.errors().len(), 1);
        assert!(trap.errors()[0].starts_with("failed to create log directory"));

        // dropped, and reported once per degraded writer
        logger.log(Severity::Key, CallSite::unknown(), format_args!("lost"));
        logger.log(Severity::Key, CallSite::unknown(), format_args!("lost"));
        assert_eq!(trap.errors().len(), 4);
    }
}
