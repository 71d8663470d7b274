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

use std::panic::Location;
use std::path::Path;

/// The source location a log call was made from.
///
/// Usually captured by [`callsite!`](crate::callsite!) (which every logging macro uses) so that
/// the location is the caller's own, not a frame inside this crate. Any fact that is not known
/// renders as `nil`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSite<'a> {
    file: Option<&'a str>,
    line: Option<u32>,
    function: Option<&'a str>,
}

impl<'a> CallSite<'a> {
    /// Create a call site from a file path, a line, and a function path such as
    /// `my_app::server::handle`.
    pub const fn new(file: &'a str, line: u32, function: &'a str) -> CallSite<'a> {
        CallSite {
            file: Some(file),
            line: Some(line),
            function: Some(function),
        }
    }

    /// Create a call site from whatever facts are known.
    pub const fn from_parts(
        file: Option<&'a str>,
        line: Option<u32>,
        function: Option<&'a str>,
    ) -> CallSite<'a> {
        CallSite {
            file,
            line,
            function,
        }
    }

    /// A call site with nothing known about it.
    pub const fn unknown() -> CallSite<'a> {
        CallSite {
            file: None,
            line: None,
            function: None,
        }
    }

    /// The location of the caller of the enclosing `#[track_caller]` function.
    ///
    /// The function name is not available this way.
    #[track_caller]
    pub fn caller() -> CallSite<'static> {
        let location = Location::caller();
        CallSite {
            file: Some(location.file()),
            line: Some(location.line()),
            function: None,
        }
    }

    /// Replace the function path.
    pub const fn with_function(mut self, function: &'a str) -> CallSite<'a> {
        self.function = Some(function);
        self
    }

    /// The last component of the file path.
    pub fn file(&self) -> Option<&'a str> {
        let file = self.file?;
        Path::new(file)
            .file_name()
            .and_then(|name| name.to_str())
            .or(Some(file))
    }

    /// The line number.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The last segment of the function path.
    pub fn function(&self) -> Option<&'a str> {
        let function = self.function?;
        function.rsplit("::").next().filter(|name| !name.is_empty())
    }
}

/// Capture the [`CallSite`] of the code this macro is expanded in.
///
/// # Examples
///
/// ```
/// fn handler() -> tierlog::CallSite<'static> {
///     tierlog::callsite!()
/// }
///
/// assert_eq!(handler().function(), Some("handler"));
/// ```
#[macro_export]
macro_rules! callsite {
    () => {
        $crate::CallSite::new(::std::file!(), ::std::line!(), $crate::__function!())
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.trim_end_matches("::{{closure}}")
    }};
}
