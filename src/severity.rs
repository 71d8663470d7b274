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
use std::str::FromStr;

use crate::Error;

/// The severity of a log message.
///
/// From lowest to highest:
///
/// - `All`
/// - `Debug`
/// - `Error`
/// - `Key`
/// - `Off`
///
/// The order is also the order of the tiers: a message is written to the file of its own
/// severity and then to every file of a lower severity. `Off` only bounds the configured
/// range and is never the severity of a message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The catch-all tier, below every message severity.
    All = 0,
    /// Diagnostic detail.
    Debug = 1,
    /// Failures.
    Error = 2,
    /// Key business events.
    Key = 3,
    /// The upper bound; disables logging when used as the minimum level.
    Off = 4,
}

impl Severity {
    /// Every severity, in ascending order.
    pub const ALL_SEVERITIES: [Severity; 5] = [
        Severity::All,
        Severity::Debug,
        Severity::Error,
        Severity::Key,
        Severity::Off,
    ];

    /// The number of severities that can own a log file.
    pub const TIERS: usize = Severity::Off as usize;

    /// The position of this severity in the ascending order.
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Look up a severity by its ordinal.
    pub const fn from_ordinal(ordinal: usize) -> Option<Severity> {
        match ordinal {
            0 => Some(Severity::All),
            1 => Some(Severity::Debug),
            2 => Some(Severity::Error),
            3 => Some(Severity::Key),
            4 => Some(Severity::Off),
            _ => None,
        }
    }

    /// The fixed three-letter code written between `#` in every line.
    pub const fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "DEG",
            Severity::Error => "ERR",
            Severity::Key => "KEY",
            Severity::All | Severity::Off => "LOG",
        }
    }

    /// The lowercase word used in log file names.
    pub const fn name(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Error => "error",
            Severity::Key => "key",
            Severity::All | Severity::Off => "log",
        }
    }

    /// The severities from `self` (inclusive) up to `Off` (exclusive).
    pub fn up_to_off(self) -> impl DoubleEndedIterator<Item = Severity> {
        (self.ordinal()..Severity::TIERS).filter_map(Severity::from_ordinal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = Error;

    /// Parse either a name (`debug`) or a tag (`DEG`), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let found = Severity::ALL_SEVERITIES.into_iter().find(|severity| {
            let name = match severity {
                Severity::All => "all",
                Severity::Off => "off",
                severity => severity.name(),
            };
            s.eq_ignore_ascii_case(name) || s.eq_ignore_ascii_case(severity.tag())
        });
        found.ok_or_else(|| Error::new("unknown severity").with_context("input", s))
    }
}
