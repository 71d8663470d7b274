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

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::Error;
use crate::Severity;
use crate::Trap;
use crate::rotation::Rotation;
use crate::trap::DefaultTrap;

/// The unit of a configured maximum file size. Units are powers of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    /// One byte.
    Bytes,
    /// 1024 bytes.
    KB,
    /// 1024 KB.
    MB,
    /// 1024 MB.
    GB,
    /// 1024 GB.
    TB,
}

impl SizeUnit {
    /// The number of bytes in one unit.
    pub const fn bytes(self) -> u64 {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::KB => 1 << 10,
            SizeUnit::MB => 1 << 20,
            SizeUnit::GB => 1 << 30,
            SizeUnit::TB => 1 << 40,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Size {
        max_backups: usize,
        max_size: u64,
        unit: SizeUnit,
    },
    Daily,
}

/// The process-wide configuration of a [`Logger`](crate::Logger).
///
/// Built once with [`WriterConfig::builder`] and never changed afterwards.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    dir: PathBuf,
    filename: String,
    min_level: Severity,
    rotation: Rotation,
    console: [bool; Severity::TIERS],
    monitor_interval: Option<Duration>,
    trap: Arc<dyn Trap>,
}

impl WriterConfig {
    /// Start configuring log files named after `filename` in the directory `dir`.
    pub fn builder(dir: impl Into<PathBuf>, filename: impl Into<String>) -> WriterConfigBuilder {
        WriterConfigBuilder::new(dir, filename)
    }

    /// The conventional setup for an application: files named after the application in
    /// `/data/applog/<app_name>` (`./data/applog/<app_name>` on Windows), rolled over at 20 MB
    /// with 50 backups, and no console echo.
    pub fn for_app(app_name: &str, min_level: Severity) -> WriterConfigBuilder {
        let base = if cfg!(windows) {
            "./data/applog/"
        } else {
            "/data/applog/"
        };
        WriterConfigBuilder::new(Path::new(base).join(app_name), app_name)
            .min_level(min_level)
            .rollover_size(50, 20, SizeUnit::MB)
            .console(false)
    }

    /// The directory all log files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The common prefix of all log file names.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The lowest severity that is written anywhere.
    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    /// The rotation policy shared by every writer.
    pub fn rotation(&self) -> &Rotation {
        &self.rotation
    }

    /// Whether lines of `severity` are echoed to standard output.
    pub fn console(&self, severity: Severity) -> bool {
        self.console
            .get(severity.ordinal())
            .copied()
            .unwrap_or(false)
    }

    /// How often the rotation monitor runs, if it runs at all.
    pub fn monitor_interval(&self) -> Option<Duration> {
        self.monitor_interval
    }

    pub(crate) fn trap(&self) -> &Arc<dyn Trap> {
        &self.trap
    }
}

/// A builder for [`WriterConfig`].
#[must_use = "call `build` to finish the configuration"]
#[derive(Debug)]
pub struct WriterConfigBuilder {
    dir: PathBuf,
    filename: String,
    min_level: Severity,
    strategy: Strategy,
    console: [bool; Severity::TIERS],
    monitor_interval: Option<Duration>,
    trap: Arc<dyn Trap>,
}

impl WriterConfigBuilder {
    fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
            min_level: Severity::Debug,
            strategy: Strategy::Size {
                max_backups: 50,
                max_size: 20,
                unit: SizeUnit::MB,
            },
            console: [false; Severity::TIERS],
            monitor_interval: Some(Duration::from_secs(1)),
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the lowest severity that is written. Messages below it have no effect.
    ///
    /// Default to [`Severity::Debug`].
    pub fn min_level(mut self, min_level: Severity) -> Self {
        self.min_level = min_level;
        self
    }

    /// Roll over a file once it would reach `max_size` units, keeping at most `max_backups`
    /// numbered backups (`<file>.1` is the newest).
    ///
    /// A `max_backups` of 0 or 1 never rolls over.
    pub fn rollover_size(mut self, max_backups: usize, max_size: u64, unit: SizeUnit) -> Self {
        self.strategy = Strategy::Size {
            max_backups,
            max_size,
            unit,
        };
        self
    }

    /// Roll over every file when the local date changes, archiving it as `<file>.<YYYY-MM-DD>`.
    pub fn rollover_daily(mut self) -> Self {
        self.strategy = Strategy::Daily;
        self
    }

    /// Echo lines of every severity to standard output, or none.
    pub fn console(mut self, enabled: bool) -> Self {
        self.console = [enabled; Severity::TIERS];
        self
    }

    /// Echo lines of one severity to standard output, or not.
    pub fn console_for(mut self, severity: Severity, enabled: bool) -> Self {
        if let Some(slot) = self.console.get_mut(severity.ordinal()) {
            *slot = enabled;
        }
        self
    }

    /// Set how often the rotation monitor re-checks every file.
    ///
    /// Default to one second.
    pub fn monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = Some(interval);
        self
    }

    /// Do not start a rotation monitor. Files then only roll over on writes and on
    /// [`Logger::check_rotation`](crate::Logger::check_rotation).
    pub fn without_monitor(mut self) -> Self {
        self.monitor_interval = None;
        self
    }

    /// Set the trap that receives I/O failures.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    /// Build the [`WriterConfig`].
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The configured filename is empty.
    /// * The maximum file size is zero or does not fit in 64 bits.
    /// * The monitor interval is zero.
    pub fn build(self) -> Result<WriterConfig, Error> {
        let Self {
            dir,
            filename,
            min_level,
            strategy,
            console,
            monitor_interval,
            trap,
        } = self;

        if filename.is_empty() {
            return Err(Error::new("filename must not be empty"));
        }

        if monitor_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::new("monitor interval must not be zero"));
        }

        let rotation = match strategy {
            Strategy::Size {
                max_backups,
                max_size,
                unit,
            } => {
                if max_size == 0 {
                    return Err(Error::new("max file size must not be zero"));
                }
                let max_size = max_size.checked_mul(unit.bytes()).ok_or_else(|| {
                    Error::new("max file size overflows")
                        .with_context("max_size", max_size)
                        .with_context("unit", format!("{unit:?}"))
                })?;
                Rotation::Size {
                    max_size,
                    max_backups,
                }
            }
            Strategy::Daily => Rotation::Daily,
        };

        Ok(WriterConfig {
            dir,
            filename,
            min_level,
            rotation,
            console,
            monitor_interval,
            trap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WriterConfig::builder("logs", "app").build().unwrap();
        assert_eq!(config.dir(), Path::new("logs"));
        assert_eq!(config.filename(), "app");
        assert_eq!(config.min_level(), Severity::Debug);
        assert_eq!(
            config.rotation(),
            &Rotation::Size {
                max_size: 20 * 1024 * 1024,
                max_backups: 50,
            }
        );
        assert!(!config.console(Severity::Key));
        assert_eq!(config.monitor_interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_for_app() {
        let config = WriterConfig::for_app("billing", Severity::Error)
            .build()
            .unwrap();
        assert!(config.dir().ends_with("data/applog/billing"));
        assert_eq!(config.filename(), "billing");
        assert_eq!(config.min_level(), Severity::Error);
    }

    #[test]
    fn test_console_flags() {
        let config = WriterConfig::builder("logs", "app")
            .console(true)
            .console_for(Severity::Debug, false)
            .console_for(Severity::Off, true)
            .rollover_daily()
            .build()
            .unwrap();
        assert!(!config.console(Severity::Debug));
        assert!(config.console(Severity::Error));
        assert!(config.console(Severity::Key));
        assert!(!config.console(Severity::Off));
        assert_eq!(config.rotation(), &Rotation::Daily);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(WriterConfig::builder("logs", "").build().is_err());
        assert!(
            WriterConfig::builder("logs", "app")
                .rollover_size(3, 0, SizeUnit::KB)
                .build()
                .is_err()
        );
        assert!(
            WriterConfig::builder("logs", "app")
                .rollover_size(3, u64::MAX, SizeUnit::TB)
                .build()
                .is_err()
        );
        assert!(
            WriterConfig::builder("logs", "app")
                .monitor_interval(Duration::ZERO)
                .build()
                .is_err()
        );
    }
}
