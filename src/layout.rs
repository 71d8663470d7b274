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
use std::fmt::Write;

use jiff::Zoned;

use crate::CallSite;
use crate::Severity;

/// Format a log line:
///
/// ```text
/// [2024-08-10 17:12:52.042] [PID:4242] #ERR# FILE:server.rs LN:88 FUNC:handle EM:connection reset
/// ```
pub(crate) fn format_line(
    now: &Zoned,
    pid: u32,
    severity: Severity,
    callsite: &CallSite<'_>,
    message: fmt::Arguments<'_>,
) -> String {
    let mut text = String::with_capacity(128);

    let time = Timestamp(now);
    let tag = severity.tag();
    let file = Nil(callsite.file());
    let line = Nil(callsite.line());
    let func = Nil(callsite.function());
    // SAFETY: write to a string always succeeds
    write!(
        &mut text,
        "[{time}] [PID:{pid}] #{tag}# FILE:{file} LN:{line} FUNC:{func} EM:{message}"
    )
    .unwrap();

    text
}

/// Format the banner that marks the start of a request in the lowest tier.
pub(crate) fn format_header(now: &Zoned, callsite: &CallSite<'_>) -> String {
    let time = Timestamp(now);
    let func = Nil(callsite.function());
    format!("\n======== {func} REQUEST START cptime:[{time}] ========")
}

/// Displays its values separated by a single space.
///
/// This is what the line-style macros such as [`debug_line!`](crate::debug_line!) log.
#[doc(hidden)]
pub struct Values<'a>(pub &'a [&'a dyn fmt::Display]);

impl fmt::Display for Values<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

struct Timestamp<'a>(&'a Zoned);

impl fmt::Display for Timestamp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.0.strftime("%Y-%m-%d %H:%M:%S");
        let millis = self.0.millisecond();
        write!(f, "{time}.{millis:03}")
    }
}

struct Nil<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for Nil<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn noon() -> Zoned {
        Zoned::from_str("2024-08-10T12:30:05.042+08[+08]").unwrap()
    }

    #[test]
    fn test_format_line() {
        let callsite = CallSite::new("src/server.rs", 88, "app::server::handle");
        let line = format_line(
            &noon(),
            4242,
            Severity::Error,
            &callsite,
            format_args!("connection {}", "reset"),
        );
        assert_eq!(
            line,
            "[2024-08-10 12:30:05.042] [PID:4242] #ERR# FILE:server.rs LN:88 FUNC:handle EM:connection reset"
        );
    }

    #[test]
    fn test_format_line_unknown_callsite() {
        let line = format_line(
            &noon(),
            1,
            Severity::Debug,
            &CallSite::unknown(),
            format_args!("hello"),
        );
        assert_eq!(
            line,
            "[2024-08-10 12:30:05.042] [PID:1] #DEG# FILE:nil LN:nil FUNC:nil EM:hello"
        );
    }

    #[test]
    fn test_format_header() {
        let callsite = CallSite::new("main.rs", 3, "app::main");
        assert_eq!(
            format_header(&noon(), &callsite),
            "\n======== main REQUEST START cptime:[2024-08-10 12:30:05.042] ========"
        );
    }

    #[test]
    fn test_values() {
        let values = Values(&[&"status" as &dyn fmt::Display, &200, &'!']);
        assert_eq!(values.to_string(), "status 200 !");
        assert_eq!(Values(&[]).to_string(), "");
    }
}
