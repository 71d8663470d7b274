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

use crate::Severity;
use crate::WriterConfig;
use crate::clock::Clock;
use crate::writer::FileWriter;

/// The writers of every configured tier, from the minimum level up to (excluding) `Off`.
///
/// The set of writers is fixed at construction; there is no writer below the minimum level.
#[derive(Debug)]
pub(crate) struct Registry {
    min_level: Severity,
    // ascending by severity; index = ordinal - min_level ordinal
    writers: Vec<FileWriter>,
}

impl Registry {
    pub(crate) fn new(config: &WriterConfig, clock: &Clock) -> Registry {
        let min_level = config.min_level();
        let writers = min_level
            .up_to_off()
            .map(|severity| {
                FileWriter::new(
                    severity,
                    config.dir(),
                    config.filename(),
                    config.rotation().clone(),
                    clock.clone(),
                    config.trap().clone(),
                )
            })
            .collect();
        Registry { min_level, writers }
    }

    pub(crate) fn get(&self, severity: Severity) -> Option<&FileWriter> {
        let index = severity.ordinal().checked_sub(self.min_level.ordinal())?;
        self.writers.get(index)
    }

    /// The writers a line of `severity` lands in: its own tier first, then every lower tier
    /// down to the lowest one.
    pub(crate) fn cascade(&self, severity: Severity) -> impl Iterator<Item = &FileWriter> {
        let end = match severity.ordinal().checked_sub(self.min_level.ordinal()) {
            Some(index) => (index + 1).min(self.writers.len()),
            None => 0,
        };
        self.writers[..end].iter().rev()
    }

    /// The writer of the lowest tier, which receives every line.
    pub(crate) fn lowest(&self) -> Option<&FileWriter> {
        self.writers.first()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &FileWriter> {
        self.writers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_registry(min_level: Severity) -> Registry {
        let config = WriterConfig::builder("unused", "test_file")
            .min_level(min_level)
            .without_monitor()
            .build()
            .unwrap();
        Registry::new(&config, &Clock::DefaultClock)
    }

    fn severities<'a>(writers: impl Iterator<Item = &'a FileWriter>) -> Vec<Severity> {
        writers.map(FileWriter::severity).collect()
    }

    #[test]
    fn test_covers_min_level_to_off() {
        let registry = new_registry(Severity::Debug);
        assert_eq!(
            severities(registry.iter()),
            [Severity::Debug, Severity::Error, Severity::Key]
        );
        assert!(registry.get(Severity::All).is_none());
        assert!(registry.get(Severity::Off).is_none());
        assert_eq!(registry.lowest().map(FileWriter::severity), Some(Severity::Debug));
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn test_cascade_walks_down() {
        let registry = new_registry(Severity::Debug);
        assert_eq!(
            severities(registry.cascade(Severity::Key)),
            [Severity::Key, Severity::Error, Severity::Debug]
        );
        assert_eq!(
            severities(registry.cascade(Severity::Debug)),
            [Severity::Debug]
        );
        assert!(registry.cascade(Severity::All).next().is_none());

        let registry = new_registry(Severity::All);
        assert_eq!(
            severities(registry.cascade(Severity::Error)),
            [Severity::Error, Severity::Debug, Severity::All]
        );
    }

    #[test]
    fn test_off_has_no_writers() {
        let registry = new_registry(Severity::Off);
        assert!(registry.lowest().is_none());
        assert!(registry.cascade(Severity::Key).next().is_none());
    }
}
