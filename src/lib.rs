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

//! Tierlog is a leveled file logger. Every severity owns a log file, every line also lands in
//! the files of all lower severities, and files roll over by size or by calendar day.
//!
//! # Overview
//!
//! A [`Logger`] is created once from an immutable [`WriterConfig`]. Messages below the
//! configured minimum severity are discarded before any formatting happens. Everything else is
//! rendered into one line:
//!
//! ```text
//! [2024-08-10 17:12:52.042] [PID:4242] #KEY# FILE:orders.rs LN:31 FUNC:accept EM:order 42 accepted
//! ```
//!
//! The line is appended to the file of its own severity and then to every lower tier, so with
//! the default minimum of `Debug` a `Key` line is found in `<name>_key.log`, `<name>_error.log`
//! and `<name>_debug.log`.
//!
//! A background monitor re-checks every file once per second, so daily files roll over at
//! midnight even when nothing is logged. I/O failures never reach the caller; they are
//! reported to a [`Trap`] and the affected file is reopened on the next write.
//!
//! # Examples
//!
//! ```
//! use tierlog::Logger;
//! use tierlog::SizeUnit;
//! use tierlog::WriterConfig;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = WriterConfig::builder(dir.path(), "app")
//!     .rollover_size(5, 10, SizeUnit::MB)
//!     .build()
//!     .unwrap();
//! let logger = Logger::new(config);
//!
//! tierlog::header!(logger);
//! tierlog::error!(logger, "failed to reach {}", "upstream");
//! tierlog::key_line!(logger, "order", 42, "accepted");
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(feature = "bridge-log")]
pub mod bridge;

mod callsite;
mod clock;
mod config;
mod error;
mod layout;
mod logger;
mod monitor;
mod registry;
mod rotation;
mod severity;
mod trap;
mod writer;

pub use self::callsite::CallSite;
pub use self::config::SizeUnit;
pub use self::config::WriterConfig;
pub use self::config::WriterConfigBuilder;
pub use self::error::Error;
pub use self::logger::Logger;
pub use self::rotation::Rotation;
pub use self::severity::Severity;
pub use self::trap::DefaultTrap;
pub use self::trap::Trap;
pub use self::writer::HandleState;
pub use self::writer::WriterStatus;

#[doc(hidden)]
pub mod __private {
    pub use crate::layout::Values;
}

/// Log a formatted message with the given severity.
///
/// Nothing is formatted and no call site is captured if the severity is disabled.
#[macro_export]
macro_rules! log {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let severity = $severity;
        if logger.enabled(severity) {
            logger.log(severity, $crate::callsite!(), ::std::format_args!($($arg)+));
        }
    }};
}

/// Log values separated by a single space with the given severity.
///
/// Nothing is formatted and no call site is captured if the severity is disabled.
#[macro_export]
macro_rules! log_line {
    ($logger:expr, $severity:expr, $($value:expr),+ $(,)?) => {{
        let logger = &$logger;
        let severity = $severity;
        if logger.enabled(severity) {
            logger.log(
                severity,
                $crate::callsite!(),
                ::std::format_args!(
                    "{}",
                    $crate::__private::Values(&[$(&$value as &dyn ::std::fmt::Display),+])
                ),
            );
        }
    }};
}

/// Log a formatted message with [`Severity::Debug`].
///
/// ```
/// # let dir = tempfile::tempdir().unwrap();
/// # let config = tierlog::WriterConfig::builder(dir.path(), "app").build().unwrap();
/// # let logger = tierlog::Logger::new(config);
/// tierlog::debug!(logger, "cache hit ratio {:.2}", 0.93);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Debug, $($arg)+)
    };
}

/// Log a formatted message with [`Severity::Error`].
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Error, $($arg)+)
    };
}

/// Log a formatted message with [`Severity::Key`].
#[macro_export]
macro_rules! key {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Severity::Key, $($arg)+)
    };
}

/// Log values with [`Severity::Debug`].
///
/// ```
/// # let dir = tempfile::tempdir().unwrap();
/// # let config = tierlog::WriterConfig::builder(dir.path(), "app").build().unwrap();
/// # let logger = tierlog::Logger::new(config);
/// tierlog::debug_line!(logger, "user", 7, "logged in");
/// ```
#[macro_export]
macro_rules! debug_line {
    ($logger:expr, $($value:expr),+ $(,)?) => {
        $crate::log_line!($logger, $crate::Severity::Debug, $($value),+)
    };
}

/// Log values with [`Severity::Error`].
#[macro_export]
macro_rules! error_line {
    ($logger:expr, $($value:expr),+ $(,)?) => {
        $crate::log_line!($logger, $crate::Severity::Error, $($value),+)
    };
}

/// Log values with [`Severity::Key`].
#[macro_export]
macro_rules! key_line {
    ($logger:expr, $($value:expr),+ $(,)?) => {
        $crate::log_line!($logger, $crate::Severity::Key, $($value),+)
    };
}

/// Write a request banner naming the enclosing function to the lowest tier.
#[macro_export]
macro_rules! header {
    ($logger:expr) => {
        $logger.header($crate::callsite!())
    };
}
